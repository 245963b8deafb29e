#![allow(unused_imports)]

//! Database models split into separate files.
//! This module re-exports individual model modules so imports like
//! `use crate::db::models::*;` work across the crate.

pub mod activity;
pub mod assignment;
pub mod availability;
pub mod competency;
pub mod game;
pub mod game_master;
pub mod notification;

pub use self::activity::*;
pub use self::assignment::*;
pub use self::availability::*;
pub use self::competency::*;
pub use self::game::*;
pub use self::game_master::*;
pub use self::notification::*;
