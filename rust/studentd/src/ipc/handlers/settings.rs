use crate::config::{parse_geometry, save_settings, AppPaths};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::require_workspace;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

/// Write the current settings; failure is reported but never fails the request.
fn persist(state: &AppState, workspace: &std::path::Path) -> bool {
    let path = AppPaths::new(workspace).settings_path();
    match save_settings(&path, &state.settings) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to save settings");
            false
        }
    }
}

fn settings_result(state: &AppState, saved: Option<bool>) -> serde_json::Value {
    let mut v = json!({ "settings": state.settings });
    if let Some(saved) = saved {
        v["saved"] = json!(saved);
    }
    v
}

fn handle_settings_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    if let Err(e) = require_workspace(state, req) {
        return e;
    }
    ok(&req.id, settings_result(state, None))
}

fn handle_settings_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace = match require_workspace(state, req) {
        Ok(w) => w,
        Err(e) => return e,
    };
    let p = &req.params;

    let theme = match p.get("theme") {
        None => None,
        Some(v) => match v.as_str().map(str::trim).filter(|s| !s.is_empty()) {
            Some(t) => Some(t.to_string()),
            None => return err(&req.id, "bad_params", "theme must be a non-empty string", None),
        },
    };
    let geometry = match p.get("geometry") {
        None => None,
        Some(v) => match v.as_str().filter(|s| parse_geometry(s).is_some()) {
            Some(g) => Some(g.trim().to_string()),
            None => {
                return err(
                    &req.id,
                    "bad_params",
                    "geometry must look like WIDTHxHEIGHT",
                    Some(json!({ "value": v })),
                )
            }
        },
    };
    let zoomed = match p.get("zoomed") {
        None => None,
        Some(v) => match v.as_bool() {
            Some(b) => Some(b),
            None => return err(&req.id, "bad_params", "zoomed must be a boolean", None),
        },
    };

    if let Some(t) = theme {
        state.settings.theme = t;
    }
    if let Some(g) = geometry {
        state.settings.geometry = g;
    }
    if let Some(z) = zoomed {
        state.settings.zoomed = z;
    }
    let saved = persist(state, &workspace);
    ok(&req.id, settings_result(state, Some(saved)))
}

fn handle_settings_toggle_theme(state: &mut AppState, req: &Request) -> serde_json::Value {
    let workspace = match require_workspace(state, req) {
        Ok(w) => w,
        Err(e) => return e,
    };
    state.settings.toggle_theme();
    let saved = persist(state, &workspace);
    ok(&req.id, settings_result(state, Some(saved)))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(handle_settings_get(state, req)),
        "settings.update" => Some(handle_settings_update(state, req)),
        "settings.toggleTheme" => Some(handle_settings_toggle_theme(state, req)),
        _ => None,
    }
}
