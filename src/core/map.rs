//! User density map.
//!
//! Profile locations are free text of the form `"City, State"`. The state
//! segment is extracted, users are counted per state and the counts are
//! handed to a [`MapRenderer`]. Renderer failures never propagate to the
//! caller; they are turned into an inline HTML error message.

use crate::{
    core::user,
    errors::{Error, Result},
};
use sea_orm::DatabaseConnection;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Users per state, ordered by state name
pub type StateCounts = BTreeMap<String, u64>;

/// Extracts the state from a `"City, State"` location.
#[must_use]
pub fn parse_state(location: &str) -> Option<&str> {
    let state = location.split(',').nth(1)?.trim();
    (!state.is_empty()).then_some(state)
}

/// Counts users per state, skipping locations without a state.
pub fn state_counts<I, S>(locations: I) -> StateCounts
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut counts = StateCounts::new();
    for location in locations {
        if let Some(state) = parse_state(location.as_ref()) {
            *counts.entry(state.to_string()).or_default() += 1;
        }
    }
    counts
}

/// Turns per-state counts into an HTML fragment
pub trait MapRenderer: Send + Sync {
    /// Renders the map.
    ///
    /// # Errors
    /// Returns an error when the renderer cannot produce a map, for example
    /// because a required asset is missing.
    fn render(&self, counts: &StateCounts) -> Result<String>;
}

/// Renders a choropleth of user density over state boundaries.
///
/// The boundary GeoJSON is read and validated once, when the renderer is
/// loaded. A missing or malformed asset is remembered and reported by every
/// render until the process is restarted.
#[derive(Debug, Clone)]
pub struct ChoroplethRenderer {
    boundaries: std::result::Result<String, String>,
}

impl ChoroplethRenderer {
    /// Loads boundaries from `boundaries_path`.
    pub fn load(boundaries_path: impl AsRef<Path>) -> Self {
        let boundaries = read_boundaries(boundaries_path.as_ref())
            .inspect(|_| debug!("Loaded state boundaries"))
            .inspect_err(|e| warn!("Map disabled: {}", e));
        Self { boundaries }
    }
}

/// Reads the asset and returns it re-serialised as compact JSON.
fn read_boundaries(path: &Path) -> std::result::Result<String, String> {
    let shown = path.display();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("state boundaries not found at {shown}: {e}"))?;
    let boundaries: serde_json::Value = serde_json::from_str(&raw)
        .map_err(|e| format!("state boundaries at {shown} are not valid GeoJSON: {e}"))?;
    if boundaries.get("features").is_none_or(|f| !f.is_array()) {
        return Err(format!("state boundaries at {shown} have no feature list"));
    }
    Ok(boundaries.to_string())
}

/// Escapes JSON for embedding in a `<script>` element.
///
/// `<`, `>` and `&` can only appear inside JSON strings, so replacing them
/// with `\uXXXX` escapes leaves the decoded value unchanged.
fn script_safe_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        match c {
            '<' => out.push_str("\\u003c"),
            '>' => out.push_str("\\u003e"),
            '&' => out.push_str("\\u0026"),
            _ => out.push(c),
        }
    }
    out
}

impl MapRenderer for ChoroplethRenderer {
    fn render(&self, counts: &StateCounts) -> Result<String> {
        let boundaries = self.boundaries.as_ref().map_err(|message| Error::MapAsset {
            message: message.clone(),
        })?;
        let counts_json = serde_json::to_string(counts).map_err(|e| Error::MapAsset {
            message: format!("could not encode state counts: {e}"),
        })?;
        let max = counts.values().copied().max().unwrap_or(0);
        debug!("Rendering choropleth for {} states", counts.len());

        Ok(format!(
            concat!(
                "<div class='user-map' data-max-users='{max}'>",
                "<script type='application/geo+json' class='map-boundaries'>{boundaries}</script>",
                "<script type='application/json' class='map-counts'>{counts}</script>",
                "</div>"
            ),
            max = max,
            boundaries = script_safe_json(boundaries),
            counts = script_safe_json(&counts_json),
        ))
    }
}

/// Inline message shown in place of a map that could not be rendered.
#[must_use]
pub fn error_html(message: &str) -> String {
    format!("<p style='color:red; text-align:center;'>Error: {message}</p>")
}

/// Renders the user map, reporting any failure as inline HTML.
pub async fn render_user_map(db: &DatabaseConnection, renderer: &dyn MapRenderer) -> String {
    let locations = match user::all_locations(db).await {
        Ok(locations) => locations,
        Err(e) => {
            warn!("Could not load user locations: {}", e);
            return error_html(&e.to_string());
        }
    };
    let counts = state_counts(&locations);
    renderer.render(&counts).unwrap_or_else(|e| {
        warn!("Map rendering failed: {}", e);
        error_html(&e.to_string())
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::user::{ProfileUpdate, create_user, update_profile};
    use crate::test_utils::*;
    use std::path::PathBuf;

    struct CountingRenderer;

    impl MapRenderer for CountingRenderer {
        fn render(&self, counts: &StateCounts) -> Result<String> {
            Ok(serde_json::to_string(counts).unwrap())
        }
    }

    fn temp_asset(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("ecotrack-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_parse_state() {
        assert_eq!(parse_state("Pune, Maharashtra"), Some("Maharashtra"));
        assert_eq!(parse_state("Pune,  Maharashtra , India"), Some("Maharashtra"));
        assert_eq!(parse_state("Pune"), None);
        assert_eq!(parse_state("Pune, "), None);
    }

    #[test]
    fn test_state_counts() {
        let counts = state_counts([
            "Pune, Maharashtra",
            "Mumbai, Maharashtra",
            "Chennai, Tamil Nadu",
            "Nowhere",
        ]);
        assert_eq!(counts.len(), 2);
        assert_eq!(counts["Maharashtra"], 2);
        assert_eq!(counts["Tamil Nadu"], 1);
    }

    #[test]
    fn test_choropleth_missing_asset() {
        let renderer = ChoroplethRenderer::load("no/such/boundaries.geojson");
        let err = renderer.render(&StateCounts::new()).unwrap_err();
        assert!(matches!(err, Error::MapAsset { .. }));
    }

    #[test]
    fn test_choropleth_rejects_non_geojson() {
        let path = temp_asset("bad.geojson", "{\"type\": \"Point\"}");
        let renderer = ChoroplethRenderer::load(&path);
        assert!(renderer.render(&StateCounts::new()).is_err());
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_choropleth_embeds_counts() {
        let path = temp_asset(
            "ok.geojson",
            r#"{"type":"FeatureCollection","features":[]}"#,
        );
        let renderer = ChoroplethRenderer::load(&path);
        let counts = state_counts(["Pune, Maharashtra"]);
        let html = renderer.render(&counts).unwrap();
        assert!(html.contains(r#"{"Maharashtra":1}"#));
        assert!(html.contains("data-max-users='1'"));
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_choropleth_escapes_script_breakout() {
        let path = temp_asset(
            "hostile.geojson",
            r#"{"type":"FeatureCollection","features":[{"properties":{"name":"</script><b>"}}]}"#,
        );
        let renderer = ChoroplethRenderer::load(&path);
        std::fs::remove_file(path).unwrap();

        let counts = state_counts(["Pune, </script><img src=x onerror=alert(1)>"]);
        let html = renderer.render(&counts).unwrap();
        assert_eq!(html.matches("</script>").count(), 2);
        assert!(!html.contains("<img"));
        assert!(!html.contains("<b>"));
        assert!(html.contains(r"\u003c/script\u003e\u003cimg src=x onerror=alert(1)\u003e"));

        let start = html.find("class='map-counts'>").unwrap() + "class='map-counts'>".len();
        let end = start + html[start..].find("</script>").unwrap();
        let decoded: StateCounts = serde_json::from_str(&html[start..end]).unwrap();
        assert_eq!(decoded["</script><img src=x onerror=alert(1)>"], 1);
    }

    #[test]
    fn test_choropleth_reads_asset_once() {
        let path = temp_asset(
            "cached.geojson",
            r#"{"type":"FeatureCollection","features":[]}"#,
        );
        let renderer = ChoroplethRenderer::load(&path);
        std::fs::remove_file(path).unwrap();

        let html = renderer.render(&StateCounts::new()).unwrap();
        assert!(html.contains(r#"{"features":[],"type":"FeatureCollection"}"#));
    }

    #[tokio::test]
    async fn test_render_user_map_reports_errors_inline() -> Result<()> {
        let db = setup_test_db().await?;
        let renderer = ChoroplethRenderer::load("missing.geojson");
        let html = render_user_map(&db, &renderer).await;
        assert!(html.starts_with("<p style='color:red; text-align:center;'>Error: "));
        assert!(html.ends_with("</p>"));
        Ok(())
    }

    #[tokio::test]
    async fn test_render_user_map_counts_profiles() -> Result<()> {
        let (db, user) = setup_with_user().await?;
        create_user(&db, "bo", "Bo", Some("Kochi, Kerala")).await?;
        create_user(&db, "cy", "Cy", Some("Unknown")).await?;
        let update = ProfileUpdate {
            location: Some("Kozhikode, Kerala".to_string()),
            ..Default::default()
        };
        update_profile(&db, user.id, update).await?;

        let html = render_user_map(&db, &CountingRenderer).await;
        assert_eq!(html, r#"{"Kerala":2}"#);
        Ok(())
    }
}
