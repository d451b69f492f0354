use std::collections::HashMap;

use color_eyre::{Result, eyre::eyre};

use crate::{
    components::popups::form::{Commit, FieldValues, Form, FormField, FormFieldKind, FormSchema},
    state::AppState,
};

use super::with_mode;

/// Put a host into a profile. `host` preselects the host list.
pub fn assign(state: &AppState, host: Option<&str>) -> Result<Form<AppState>> {
    let catalog = state.store.catalog();
    let hosts = catalog.host_names();
    let profiles = catalog.group_names();
    if hosts.is_empty() {
        return Err(eyre!("add a host first"));
    }
    if profiles.is_empty() {
        return Err(eyre!("create a profile first"));
    }

    let mut host_field = FormField::new("host", "Host", FormFieldKind::select(hosts.clone()));
    if let Some(host) = host.filter(|h| hosts.iter().any(|n| n == h)) {
        host_field = host_field.default_value(host);
    }
    let schema = FormSchema::new(
        "Assign host",
        vec![
            host_field,
            FormField::new("profile", "Profile", FormFieldKind::select(profiles)),
        ],
    )
    .submit_label("Assign")
    .min_size(56, 14);

    let form = Form::new(
        with_mode(schema, state),
        |values: &FieldValues, state: &mut AppState| {
            let (host, profile) = (&values["host"], &values["profile"]);
            state
                .store
                .update(|c| c.assign(host, profile))
                .map_err(|e| e.to_string())?;
            state.info(format!("`{host}` added to `{profile}`"));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?;
    Ok(form)
}

/// Take a host out of a profile. The host name is typed and checked against
/// the members of whichever profile is selected.
pub fn unassign(state: &AppState, profile: Option<&str>) -> Result<Form<AppState>> {
    let catalog = state.store.catalog();
    let profiles = catalog.group_names();
    if profiles.is_empty() {
        return Err(eyre!("no profiles yet"));
    }
    let members: HashMap<String, Vec<String>> = catalog
        .groups()
        .iter()
        .map(|g| (g.name.clone(), g.hosts.clone()))
        .collect();

    let mut profile_field =
        FormField::new("profile", "Profile", FormFieldKind::select(profiles.clone()));
    if let Some(profile) = profile.filter(|p| profiles.iter().any(|n| n == p)) {
        profile_field = profile_field.default_value(profile);
    }
    let schema = FormSchema::new(
        "Unassign host",
        vec![
            profile_field,
            FormField::new("host", "Host", FormFieldKind::Text)
                .required()
                .validator_with(["profile"], move |value, values| {
                    let profile = values.get("profile").map(String::as_str).unwrap_or("");
                    let listed = members
                        .get(profile)
                        .is_some_and(|hosts| hosts.iter().any(|h| h == value.trim()));
                    if listed {
                        Ok(())
                    } else {
                        Err(format!("`{}` is not in `{profile}`", value.trim()))
                    }
                }),
        ],
    )
    .submit_label("Unassign")
    .min_size(56, 14);

    let form = Form::new(
        with_mode(schema, state),
        |values: &FieldValues, state: &mut AppState| {
            let (host, profile) = (values["host"].trim(), &values["profile"]);
            state
                .store
                .update(|c| c.unassign(host, profile))
                .map_err(|e| e.to_string())?;
            state.info(format!("`{host}` removed from `{profile}`"));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?;
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::popups::form::{FormError, SubmitOutcome, ValidationMode};
    use crate::config::ValidationSetting;
    use crate::state::test_support::{seeded_state, test_state};

    #[test]
    fn assign_preselects_host_and_saves() {
        let (mut state, _dir) = seeded_state();
        let mut form = assign(&state, Some("db")).unwrap();
        assert_eq!(form.value("host").unwrap(), "db");
        assert_eq!(form.value("profile").unwrap(), "prod");

        assert_eq!(form.submit(&mut state), Ok(SubmitOutcome::Closed));
        assert_eq!(
            state.store.catalog().group("prod").unwrap().hosts,
            vec!["web".to_string(), "db".to_string()]
        );
    }

    #[test]
    fn assigning_a_member_again_fails() {
        let (mut state, _dir) = seeded_state();
        let mut form = assign(&state, Some("web")).unwrap();
        let errors = form.submit(&mut state).unwrap_err();
        assert!(matches!(errors.first(), FormError::CommitFailed { .. }));
        assert_eq!(form.form_errors().len(), 1);
    }

    #[test]
    fn assign_needs_hosts_and_profiles() {
        let (state, _dir) = test_state();
        assert!(assign(&state, None).is_err());
    }

    #[test]
    fn unassign_cross_validates_membership() {
        let (mut state, _dir) = seeded_state();
        let mut form = unassign(&state, Some("prod")).unwrap();
        form.set_value("host", "db").unwrap();

        let errors = form.submit(&mut state).unwrap_err();
        assert_eq!(errors.first().field(), Some("host"));
        assert_eq!(errors.first().message(), "`db` is not in `prod`");

        form.set_value("host", "web").unwrap();
        assert_eq!(form.submit(&mut state), Ok(SubmitOutcome::Closed));
        assert!(state.store.catalog().group("prod").unwrap().hosts.is_empty());
    }

    #[test]
    fn immediate_mode_rechecks_host_when_profile_changes() {
        let (mut state, _dir) = seeded_state();
        state
            .store
            .update(|c| {
                c.add_group(catalog::Group::new("dev"))?;
                c.assign("db", "dev")
            })
            .unwrap();
        state.config.validation_mode = ValidationSetting::Immediate;

        let mut form = unassign(&state, Some("prod")).unwrap();
        assert_eq!(form.schema().validation_mode, ValidationMode::Immediate);
        form.set_value("host", "db").unwrap();
        assert!(form.field_error("host").is_some());

        form.set_value("profile", "dev").unwrap();
        assert!(form.field_error("host").is_none());
    }
}
