//! Import and export of JSON bundles.
use std::path::{Path, PathBuf};

use catalog::{Bundle, ImportMode};
use color_eyre::Result;
use strum::VariantNames;
use tracing::debug;

use crate::{
    components::popups::form::{Commit, FieldValues, Form, FormField, FormFieldKind, FormSchema},
    state::AppState,
};

use super::with_mode;

const SCOPE_ALL: &str = "all";
const SCOPE_PROFILE: &str = "profile";

/// The `*.json` file after `current` in its directory (wrapping), or the
/// first one when `current` is not a bundle there. An empty `current`
/// searches `fallback`.
pub fn next_json_beside(current: &str, fallback: &Path) -> Option<String> {
    let current = current.trim();
    let path = Path::new(current);
    let dir = if current.is_empty() {
        fallback.to_path_buf()
    } else if path.is_dir() {
        path.to_path_buf()
    } else {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    };

    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    debug!(dir = %dir.display(), found = files.len(), "browse bundles");

    let next = match files.iter().position(|p| p == path) {
        Some(i) => files.get(i + 1).or_else(|| files.first()),
        None => files.first(),
    };
    next.map(|p| p.display().to_string())
}

fn path_exists(value: &str) -> Result<(), String> {
    if Path::new(value.trim()).is_file() {
        Ok(())
    } else {
        Err(format!("`{}` does not exist", value.trim()))
    }
}

pub fn import(state: &AppState) -> Result<Form<AppState>> {
    let fallback = state.exports_dir.clone();
    let schema = FormSchema::new(
        "Import bundle",
        vec![
            FormField::new("path", "File", FormFieldKind::Text)
                .help("JSON bundle written by export")
                .required()
                .validator(path_exists),
            FormField::new("mode", "Mode", FormFieldKind::select(ImportMode::VARIANTS.iter().copied()))
                .help("merge keeps existing entries, replace drops them"),
        ],
    )
    .submit_label("Import")
    .browse("path", move |current| next_json_beside(current, &fallback))
    .min_size(64, 16);

    let form = Form::new(
        with_mode(schema, state),
        |values: &FieldValues, state: &mut AppState| {
            let path = PathBuf::from(values["path"].trim());
            let mode: ImportMode = values["mode"]
                .parse()
                .map_err(|_| format!("unknown import mode `{}`", values["mode"]))?;
            let bundle = Bundle::read(&path).map_err(|e| e.to_string())?;
            let summary = state
                .store
                .update(|c| c.import(bundle, mode))
                .map_err(|e| e.to_string())?;
            state.info(format!("imported {}: {summary}", path.display()));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?;
    Ok(form)
}

/// Export everything, or one profile with its hosts. `profile` preselects
/// the profile scope.
pub fn export(state: &AppState, profile: Option<&str>) -> Result<Form<AppState>> {
    let profiles = state.store.catalog().group_names();
    let default_path = state.exports_dir.join(match profile {
        Some(name) => format!("{name}.json"),
        None => "hostdeck.json".to_string(),
    });

    let mut fields = vec![
        FormField::new("path", "File", FormFieldKind::Text)
            .required()
            .default_value(default_path.display().to_string()),
    ];
    if !profiles.is_empty() {
        let chosen = profile.filter(|p| profiles.iter().any(|n| n == p));
        let mut scope = FormField::new(
            "scope",
            "Scope",
            FormFieldKind::select([SCOPE_ALL, SCOPE_PROFILE]),
        );
        let mut which = FormField::new("profile", "Profile", FormFieldKind::select(profiles.clone()))
            .visible_when("scope", SCOPE_PROFILE);
        if let Some(name) = chosen {
            scope = scope.default_value(SCOPE_PROFILE);
            which = which.default_value(name);
        }
        fields.push(scope);
        fields.push(which);
    }
    let schema = FormSchema::new("Export bundle", fields)
        .submit_label("Export")
        .min_size(64, 16);

    let form = Form::new(
        with_mode(schema, state),
        |values: &FieldValues, state: &mut AppState| {
            let path = PathBuf::from(values["path"].trim());
            let catalog = state.store.catalog();
            let bundle = match values.get("scope").map(String::as_str) {
                Some(SCOPE_PROFILE) => {
                    Bundle::for_group(catalog, &values["profile"]).map_err(|e| e.to_string())?
                }
                _ => Bundle::from_catalog(catalog),
            };
            bundle.write(&path).map_err(|e| e.to_string())?;
            state.info(format!(
                "exported {} host(s), {} profile(s) to {}",
                bundle.hosts.len(),
                bundle.groups.len(),
                path.display()
            ));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?;
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::popups::form::SubmitOutcome;
    use crate::state::test_support::{seeded_state, test_state};
    use tempfile::TempDir;

    #[test]
    fn browse_cycles_json_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path();
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.join(name), "{}").unwrap();
        }
        let a = dir.join("a.json").display().to_string();
        let b = dir.join("b.json").display().to_string();

        assert_eq!(next_json_beside("", dir), Some(a.clone()));
        assert_eq!(next_json_beside(&a, dir), Some(b.clone()));
        assert_eq!(next_json_beside(&b, dir), Some(a.clone()));
        assert_eq!(
            next_json_beside(&dir.join("notes.txt").display().to_string(), dir),
            Some(a)
        );
        assert_eq!(next_json_beside("", &dir.join("missing")), None);
    }

    #[test]
    fn export_then_import_profile_bundle() {
        let (mut state, dir) = seeded_state();
        let target = dir.path().join("prod.json");

        let mut form = export(&state, Some("prod")).unwrap();
        assert_eq!(form.value("scope").unwrap(), SCOPE_PROFILE);
        assert!(form.is_visible("profile").unwrap());
        form.set_value("path", target.display().to_string()).unwrap();
        assert_eq!(form.submit(&mut state), Ok(SubmitOutcome::Closed));

        let bundle = Bundle::read(&target).unwrap();
        assert_eq!(bundle.groups.len(), 1);
        assert_eq!(bundle.hosts.len(), 1);

        let (mut fresh, _fresh_dir) = test_state();
        let mut form = import(&fresh).unwrap();
        form.set_value("path", target.display().to_string()).unwrap();
        assert_eq!(form.submit(&mut fresh), Ok(SubmitOutcome::Closed));
        assert!(fresh.store.catalog().group("prod").unwrap().contains("web"));
        assert!(fresh.store.catalog().host("db").is_none());
    }

    #[test]
    fn import_requires_existing_file() {
        let (mut state, dir) = test_state();
        let mut form = import(&state).unwrap();
        form.set_value("path", dir.path().join("nope.json").display().to_string())
            .unwrap();
        let errors = form.submit(&mut state).unwrap_err();
        assert_eq!(errors.first().field(), Some("path"));
    }

    #[test]
    fn export_without_profiles_has_no_scope() {
        let (state, _dir) = test_state();
        let form = export(&state, None).unwrap();
        assert!(form.field("scope").is_err());
        assert!(form.value("path").unwrap().ends_with("hostdeck.json"));
    }
}
