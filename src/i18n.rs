/*
Simple i18n helper for the backend.

This module provides:
- A tiny embedded translations store for FR/EN (compile-time embedded JSON).
- A simple `tr` function to lookup translations by key + optional params.
- A `t` convenience wrapper using the default language (DEFAULT_LANG).

Usage:
    use crate::i18n;
    let msg = i18n::t("assignment.already_assigned");
    let msg_with = i18n::tr(None, "notifications.assignment.message", Some(&[("title", "Session VR"), ("date", "2025-01-10"), ("start", "14:00"), ("end", "15:00")]));

Notes:
- Placeholders in translation strings use single-brace format: `{name}`.
- Default language is `fr`. If a key is missing for the requested language,
  the fallback language will be used.
*/

use std::collections::HashMap;
use std::sync::OnceLock;

pub const DEFAULT_LANG: &str = "fr";

static TRANSLATIONS: OnceLock<HashMap<String, HashMap<String, String>>> = OnceLock::new();

const FR_JSON: &str = r#"
{
  "notifications.assignment.title": "Nouvelle affectation",
  "notifications.assignment.message": "Vous êtes affecté(e) à « {title} » le {date} de {start} à {end}.",
  "notifications.modified.title": "Événement modifié",
  "notifications.modified.message": "L'événement « {title} » a été modifié : {date} de {start} à {end}.",
  "notifications.cancelled.title": "Événement annulé",
  "notifications.cancelled.message": "L'événement « {title} » du {date} a été annulé.",
  "notifications.unassigned.title": "Affectation retirée",
  "notifications.unassigned.message": "Votre affectation à « {title} » le {date} a été retirée.",
  "assignment.assigned_to": "Affecté à {name}",
  "assignment.secondary_added": "{name} ajouté(e) en renfort",
  "assignment.removed": "{name} retiré(e) de l'événement",
  "assignment.all_removed": "Toutes les affectations ont été retirées",
  "assignment.auto_assigned": "Affectation automatique : {name} (niveau {level})",
  "assignment.already_assigned": "Ce Game Master est déjà affecté à cet événement",
  "assignment.not_assigned": "Ce Game Master n'est pas affecté à cet événement",
  "assignment.has_assignments": "Cet événement a déjà des affectations, ajoutez un renfort",
  "assignment.no_candidate": "Aucun Game Master éligible pour cet événement",
  "assignment.requires_confirmation": "Conflits détectés, confirmation requise",
  "availability.none_declared": "Aucune disponibilité déclarée pour cette date",
  "availability.unavailable": "Indisponible ce jour-là",
  "availability.incompatible": "Créneaux déclarés non compatibles avec l'horaire",
  "conflicts.overlap": "Chevauchement avec « {title} » ({start}–{end})",
  "conflicts.minimum_break": "Pause minimale non respectée avec « {title} » : {gap} min au lieu de {required} min",
  "not_found.activity": "Événement introuvable",
  "not_found.gm": "Game Master introuvable",
  "not_found.game": "Jeu introuvable",
  "not_found.notification": "Notification introuvable",
  "activity.deleted": "Événement supprimé",
  "planner.sync_done": "Synchronisation terminée : {count} événement(s)",
  "planner.not_configured": "Le flux du planificateur n'est pas configuré",
  "app.name": "Console d'exploitation du centre VR"
}
"#;

const EN_JSON: &str = r#"
{
  "notifications.assignment.title": "New assignment",
  "notifications.assignment.message": "You are assigned to \"{title}\" on {date} from {start} to {end}.",
  "notifications.modified.title": "Event modified",
  "notifications.modified.message": "The event \"{title}\" was modified: {date} from {start} to {end}.",
  "notifications.cancelled.title": "Event cancelled",
  "notifications.cancelled.message": "The event \"{title}\" on {date} was cancelled.",
  "notifications.unassigned.title": "Assignment removed",
  "notifications.unassigned.message": "Your assignment to \"{title}\" on {date} was removed.",
  "assignment.assigned_to": "Assigned to {name}",
  "assignment.secondary_added": "{name} added as secondary",
  "assignment.removed": "{name} removed from the event",
  "assignment.all_removed": "All assignments removed",
  "assignment.auto_assigned": "Auto-assigned: {name} (level {level})",
  "assignment.already_assigned": "This Game Master is already assigned to this event",
  "assignment.not_assigned": "This Game Master is not assigned to this event",
  "assignment.has_assignments": "This event already has assignments, add a secondary GM instead",
  "assignment.no_candidate": "No eligible Game Master for this event",
  "assignment.requires_confirmation": "Conflicts detected, confirmation required",
  "availability.none_declared": "No availability declared for this date",
  "availability.unavailable": "Unavailable on that day",
  "availability.incompatible": "Declared slots do not cover the event time",
  "conflicts.overlap": "Overlaps \"{title}\" ({start}–{end})",
  "conflicts.minimum_break": "Minimum break violated with \"{title}\": {gap} min instead of {required} min",
  "not_found.activity": "Activity not found",
  "not_found.gm": "Game Master not found",
  "not_found.game": "Game not found",
  "not_found.notification": "Notification not found",
  "activity.deleted": "Activity deleted",
  "planner.sync_done": "Sync finished: {count} event(s)",
  "planner.not_configured": "Planner feed is not configured",
  "app.name": "VR center operations console"
}
"#;

/// Initialize translations map (lazy).
fn build_translations() -> HashMap<String, HashMap<String, String>> {
    let mut out: HashMap<String, HashMap<String, String>> = HashMap::new();

    // Parse FR
    let fr_map: HashMap<String, String> = serde_json::from_str(FR_JSON).unwrap_or_else(|e| {
        panic!("failed to parse FR_JSON in i18n module: {}", e);
    });
    out.insert("fr".to_string(), fr_map);

    // Parse EN
    let en_map: HashMap<String, String> = serde_json::from_str(EN_JSON).unwrap_or_else(|e| {
        panic!("failed to parse EN_JSON in i18n module: {}", e);
    });
    out.insert("en".to_string(), en_map);

    out
}

/// Returns the global translations map (lang -> (key -> message)).
fn translations() -> &'static HashMap<String, HashMap<String, String>> {
    TRANSLATIONS.get_or_init(build_translations)
}

/// Normalize a language tag into a short, lowercase code (e.g. "fr-FR" -> "fr").
pub fn normalize_language(lang: &str) -> String {
    lang.split('-').next().unwrap_or(lang).to_lowercase()
}

/// Returns true if the given language code is supported by the backend i18n
/// translations (e.g. "fr", "en").
pub fn is_supported_language(lang: &str) -> bool {
    translations().contains_key(lang)
}

/// Translate a key using an explicit language (or default if None).
///
/// - `lang`: optional language code (`"fr"`, `"en"`, ...). If None, DEFAULT_LANG is used.
/// - `key`: translation key (flat string, e.g. "assignment.already_assigned").
/// - `params`: optional slice of (name, value) for placeholder replacement. Replacements use single-brace placeholders `{name}`.
///
/// Returns the translated and parameter-substituted string. If no translation is found,
/// returns a sensible fallback (default language value or the key itself).
pub fn tr(lang: Option<&str>, key: &str, params: Option<&[(&str, &str)]>) -> String {
    let map = translations();

    let desired = lang.unwrap_or(DEFAULT_LANG);

    // Try requested language
    let val = map
        .get(desired)
        .and_then(|m| m.get(key))
        .cloned()
        // Fallback to default language
        .or_else(|| map.get(DEFAULT_LANG).and_then(|m| m.get(key)).cloned())
        // If still missing, return the key itself (useful in logs)
        .unwrap_or_else(|| key.to_string());

    if let Some(params) = params {
        let mut s = val;
        for (k, v) in params {
            s = s.replace(&format!("{{{}}}", k), v);
        }
        s
    } else {
        val
    }
}

/// Convenience wrapper: translate using default language (DEFAULT_LANG).
pub fn t(key: &str) -> String {
    tr(None, key, None)
}

/// Convenience wrapper with params (default language).
pub fn t_with(key: &str, params: &[(&str, &str)]) -> String {
    tr(None, key, Some(params))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tr_basic() {
        let s = tr(Some("fr"), "notifications.assignment.title", None);
        assert!(s.contains("affectation"));
    }

    #[test]
    fn test_t_with_params() {
        let s = t_with(
            "notifications.assignment.message",
            &[
                ("title", "Session VR"),
                ("date", "2025-01-10"),
                ("start", "14:00"),
                ("end", "15:00"),
            ],
        );
        assert!(s.contains("Session VR"));
        assert!(s.contains("14:00"));
    }

    #[test]
    fn test_fallback_to_default() {
        // Unknown language falls back to default (fr)
        let s = tr(Some("de"), "notifications.assignment.title", None);
        assert!(s.contains("affectation"));
    }

    #[test]
    fn missing_key_returns_key() {
        let k = "non.existent.key";
        let s = t(k);
        assert_eq!(s, k.to_string());
    }

    #[test]
    fn test_is_supported_language() {
        assert!(is_supported_language("fr"));
        assert!(is_supported_language("en"));
        assert!(!is_supported_language("de"));
    }

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("fr-FR"), "fr");
        assert_eq!(normalize_language("en"), "en");
        assert_eq!(normalize_language("EN-us"), "en");
    }
}
