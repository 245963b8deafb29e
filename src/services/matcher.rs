use std::sync::Arc;

use serde::Serialize;
use sqlx::SqlitePool;
use tokio::sync::RwLock;

use crate::db::models::MappingCatalogEntry;
use crate::db::GameMappingRepository;
use crate::error::AppResult;

/// Result of resolving an event title against the mapping catalog.
///
/// `confidence` is a score in [0, 100]: 100 for an exact full-title match,
/// otherwise the share of the title covered by the pattern (clamped to 1..=99
/// so any substring match scores above "no match"). Longer patterns always
/// beat shorter ones, which is the property callers rely on.
#[derive(Debug, Clone, Serialize)]
pub struct GameMatch {
    pub game_id: Option<String>,
    pub game_name: Option<String>,
    pub average_duration: Option<i64>,
    pub confidence: i64,
}

impl GameMatch {
    fn none() -> Self {
        Self {
            game_id: None,
            game_name: None,
            average_duration: None,
            confidence: 0,
        }
    }
}

/// Cached mapping catalog (active mappings joined with active games).
///
/// Read-through: the first lookup after an invalidation reloads from the
/// database. Mutations of games or mappings must call `invalidate`.
pub struct MappingCache {
    entries: RwLock<Option<Arc<Vec<MappingCatalogEntry>>>>,
}

impl MappingCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(None),
        }
    }

    pub async fn load(&self, pool: &SqlitePool) -> AppResult<Arc<Vec<MappingCatalogEntry>>> {
        if let Some(catalog) = self.entries.read().await.as_ref() {
            return Ok(catalog.clone());
        }

        let mut guard = self.entries.write().await;
        // Another task may have filled the cache while we waited for the lock.
        if let Some(catalog) = guard.as_ref() {
            return Ok(catalog.clone());
        }

        let catalog = Arc::new(GameMappingRepository::list_catalog(pool).await?);
        tracing::debug!("Loaded {} mapping catalog entries", catalog.len());
        *guard = Some(catalog.clone());
        Ok(catalog)
    }

    pub async fn invalidate(&self) {
        *self.entries.write().await = None;
    }
}

impl Default for MappingCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve an event title to a catalog game. Pure lookup, never fails: an
/// unknown title yields an all-null match with confidence 0.
pub fn find_matching_game(title: &str, catalog: &[MappingCatalogEntry]) -> GameMatch {
    let title_trimmed = title.trim();
    if title_trimmed.is_empty() {
        return GameMatch::none();
    }

    let title_lower = title_trimmed.to_lowercase();
    let title_len = title_lower.chars().count() as i64;

    let mut best: Option<(&MappingCatalogEntry, i64)> = None;

    for entry in catalog {
        let pattern = entry.event_name_pattern.trim().to_lowercase();
        if pattern.is_empty() || !title_lower.contains(&pattern) {
            continue;
        }

        let pattern_len = pattern.chars().count() as i64;
        // Most specific pattern wins; first one seen keeps ties.
        match best {
            Some((_, best_len)) if pattern_len <= best_len => {}
            _ => best = Some((entry, pattern_len)),
        }
    }

    match best {
        Some((entry, pattern_len)) => {
            let confidence = if pattern_len >= title_len {
                100
            } else {
                (pattern_len * 100 / title_len).clamp(1, 99)
            };
            GameMatch {
                game_id: Some(entry.game_id.clone()),
                game_name: Some(entry.game_name.clone()),
                average_duration: Some(entry.average_duration),
                confidence,
            }
        }
        None => GameMatch::none(),
    }
}

/// Convenience wrapper: load the catalog through the cache and match.
pub async fn match_title(
    pool: &SqlitePool,
    cache: &MappingCache,
    title: &str,
) -> AppResult<GameMatch> {
    let catalog = cache.load(pool).await?;
    Ok(find_matching_game(title, &catalog))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(pattern: &str, game_id: &str) -> MappingCatalogEntry {
        MappingCatalogEntry {
            event_name_pattern: pattern.to_string(),
            game_id: game_id.to_string(),
            game_name: format!("game-{game_id}"),
            average_duration: 45,
            minimum_break_minutes: 15,
        }
    }

    #[test]
    fn longest_pattern_wins() {
        let catalog = vec![entry("VR", "a"), entry("VR Horror", "b")];
        let m = find_matching_game("Session VR Horror Night", &catalog);
        assert_eq!(m.game_id.as_deref(), Some("b"));
    }

    #[test]
    fn match_is_case_insensitive() {
        let catalog = vec![entry("arena", "a")];
        let m = find_matching_game("Tournoi ARENA du samedi", &catalog);
        assert_eq!(m.game_id.as_deref(), Some("a"));
        assert!(m.confidence > 0 && m.confidence < 100);
    }

    #[test]
    fn exact_title_scores_full_confidence() {
        let catalog = vec![entry("Cosmos Odyssey", "a")];
        let m = find_matching_game("Cosmos Odyssey", &catalog);
        assert_eq!(m.confidence, 100);
        assert_eq!(m.average_duration, Some(45));
    }

    #[test]
    fn longer_pattern_never_scores_below_shorter_one() {
        let catalog = vec![entry("VR", "a"), entry("VR Horror", "b")];
        let title = "Session VR Horror Night";
        let short = find_matching_game(title, &catalog[..1]);
        let long = find_matching_game(title, &catalog);
        assert!(long.confidence >= short.confidence);
    }

    #[test]
    fn no_match_yields_nulls_and_zero() {
        let catalog = vec![entry("VR", "a")];
        let m = find_matching_game("Réunion d'équipe", &catalog);
        assert!(m.game_id.is_none());
        assert!(m.game_name.is_none());
        assert!(m.average_duration.is_none());
        assert_eq!(m.confidence, 0);
    }

    #[test]
    fn blank_title_never_matches() {
        let catalog = vec![entry("VR", "a")];
        let m = find_matching_game("   ", &catalog);
        assert_eq!(m.confidence, 0);
    }

    #[tokio::test]
    async fn cache_reloads_after_invalidation() {
        use crate::db::models::{CreateGame, CreateGameMapping};
        use crate::db::{GameMappingRepository, GameRepository};

        let pool = crate::db::testing::pool().await;
        let cache = MappingCache::new();

        assert!(cache.load(&pool).await.unwrap().is_empty());

        let game = GameRepository::create(
            &pool,
            CreateGame {
                name: "Arena".into(),
                category: None,
                location: None,
                average_duration: Some(30),
                minimum_break_minutes: Some(10),
            },
        )
        .await
        .unwrap();
        GameMappingRepository::create(
            &pool,
            CreateGameMapping {
                event_name_pattern: "Arena".into(),
                game_id: game.id.clone(),
            },
        )
        .await
        .unwrap();

        // Still served from cache until invalidated.
        assert!(cache.load(&pool).await.unwrap().is_empty());
        cache.invalidate().await;
        assert_eq!(cache.load(&pool).await.unwrap().len(), 1);
    }
}
