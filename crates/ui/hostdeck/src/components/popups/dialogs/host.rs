use catalog::{AuthKind, AuthMethod, CatalogError, Host};
use color_eyre::Result;
use strum::VariantNames;

use crate::{
    components::popups::form::{Commit, FieldValues, Form, FormField, FormFieldKind, FormSchema},
    state::AppState,
};

use super::{no_whitespace, optional, port, with_mode};

fn schema(title: &str, state: &AppState) -> FormSchema {
    let schema = FormSchema::new(
        title,
        vec![
            FormField::new("name", "Name", FormFieldKind::Text)
                .help("Short unique name, used for windows and profiles")
                .required()
                .validator(no_whitespace),
            FormField::new("hostname", "Hostname", FormFieldKind::Text)
                .help("DNS name or IP address")
                .required(),
            FormField::new("port", "Port", FormFieldKind::Text)
                .default_value(catalog::DEFAULT_SSH_PORT.to_string())
                .validator(port),
            FormField::new("user", "User", FormFieldKind::Text)
                .help("Leave empty to use the ssh default"),
            FormField::new("auth", "Auth", FormFieldKind::select(AuthMethod::VARIANTS.iter().copied())),
            FormField::new("identity", "Identity file", FormFieldKind::Text)
                .help("Private key passed with -i (optional)")
                .visible_when("auth", AuthMethod::Key.to_string()),
            FormField::new("password", "Password", FormFieldKind::Secret)
                .help("Stored in the catalog and passed to sshpass")
                .visible_when("auth", AuthMethod::Password.to_string()),
        ],
    )
    .min_size(64, 26);
    with_mode(schema, state)
}

/// Turn collected values into a `Host`. Fields hidden by the auth choice are ignored.
fn host_from_values(values: &FieldValues) -> Result<Host, String> {
    let get = |key: &str| values.get(key).map(String::as_str).unwrap_or("");
    let port = get("port")
        .trim()
        .parse::<u16>()
        .map_err(|_| format!("invalid port `{}`", get("port")))?;
    let auth = match get("auth").parse::<AuthMethod>() {
        Ok(AuthMethod::Key) => AuthKind::Key {
            identity: optional(values.get("identity")),
        },
        Ok(AuthMethod::Password) => AuthKind::Password {
            password: Some(get("password").to_string()).filter(|p| !p.is_empty()),
        },
        Ok(AuthMethod::Agent) => AuthKind::Agent,
        Err(_) => return Err(format!("unknown auth method `{}`", get("auth"))),
    };

    let mut host = Host::new(get("name").trim(), get("hostname").trim());
    host.port = port;
    host.user = optional(values.get("user"));
    host.auth = auth;
    Ok(host)
}

pub fn add_host(state: &AppState) -> Result<Form<AppState>> {
    let form = Form::new(
        schema("Add host", state),
        |values: &FieldValues, state: &mut AppState| {
            let host = host_from_values(values)?;
            let name = host.name.clone();
            state
                .store
                .update(|c| c.add_host(host))
                .map_err(|e| e.to_string())?;
            state.info(format!("host `{name}` added"));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?;
    Ok(form)
}

pub fn edit_host(state: &AppState, name: &str) -> Result<Form<AppState>> {
    let host = state
        .store
        .catalog()
        .host(name)
        .ok_or_else(|| CatalogError::UnknownHost(name.to_string()))?
        .clone();

    let (identity, password) = match &host.auth {
        AuthKind::Key { identity } => (identity.clone().unwrap_or_default(), String::new()),
        AuthKind::Password { password } => (String::new(), password.clone().unwrap_or_default()),
        AuthKind::Agent => (String::new(), String::new()),
    };
    let prefill = [
        ("name", host.name.clone()),
        ("hostname", host.hostname.clone()),
        ("port", host.port.to_string()),
        ("user", host.user.clone().unwrap_or_default()),
        ("auth", host.auth.method().to_string()),
        ("identity", identity),
        ("password", password),
    ];

    let old_name = host.name;
    let form = Form::new(
        schema(&format!("Edit host `{old_name}`"), state),
        move |values: &FieldValues, state: &mut AppState| {
            let host = host_from_values(values)?;
            let name = host.name.clone();
            state
                .store
                .update(|c| c.update_host(&old_name, host))
                .map_err(|e| e.to_string())?;
            state.info(format!("host `{name}` updated"));
            Ok(Commit::Done)
        },
        |_: &mut AppState| {},
    )?
    .with_values(prefill)?;
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::popups::form::{FormError, SubmitOutcome};
    use crate::state::test_support::{seeded_state, test_state};
    use pretty_assertions::assert_eq;

    #[test]
    fn add_host_persists_to_catalog() {
        let (mut state, _dir) = test_state();
        let mut form = add_host(&state).unwrap();
        form.set_value("name", "web").unwrap();
        form.set_value("hostname", "web.example.org").unwrap();
        form.set_value("user", "deploy").unwrap();
        form.set_value("port", "2222").unwrap();

        assert_eq!(form.submit(&mut state), Ok(SubmitOutcome::Closed));
        let host = state.store.catalog().host("web").unwrap();
        assert_eq!(host.destination(), "deploy@web.example.org");
        assert_eq!(host.port, 2222);
        assert_eq!(host.auth, AuthKind::Key { identity: None });

        let reopened = catalog::CatalogStore::open(state.store.path()).unwrap();
        assert!(reopened.catalog().host("web").is_some());
    }

    #[test]
    fn auth_choice_toggles_credential_fields() {
        let (state, _dir) = test_state();
        let mut form = add_host(&state).unwrap();
        assert!(form.is_visible("identity").unwrap());
        assert!(!form.is_visible("password").unwrap());

        form.set_value("auth", "password").unwrap();
        assert!(!form.is_visible("identity").unwrap());
        assert!(form.is_visible("password").unwrap());

        form.set_value("auth", "agent").unwrap();
        assert!(!form.is_visible("identity").unwrap());
        assert!(!form.is_visible("password").unwrap());
    }

    #[test]
    fn invalid_input_is_reported_per_field() {
        let (mut state, _dir) = test_state();
        let mut form = add_host(&state).unwrap();
        form.set_value("name", "web 1").unwrap();
        form.set_value("port", "99999").unwrap();

        let errors = form.submit(&mut state).unwrap_err();
        let fields: Vec<_> = errors.iter().filter_map(|e| e.field()).collect();
        assert_eq!(fields, vec!["name", "hostname", "port"]);
        assert!(state.store.catalog().is_empty());
    }

    #[test]
    fn duplicate_name_is_a_commit_failure() {
        let (mut state, _dir) = seeded_state();
        let mut form = add_host(&state).unwrap();
        form.set_value("name", "web").unwrap();
        form.set_value("hostname", "other").unwrap();

        let errors = form.submit(&mut state).unwrap_err();
        assert!(matches!(errors.first(), FormError::CommitFailed { .. }));
        assert!(!form.is_closed());
        assert_eq!(state.store.catalog().host("web").unwrap().hostname, "web.example.org");
    }

    #[test]
    fn edit_prefills_and_renames() {
        let (mut state, _dir) = seeded_state();
        let mut form = edit_host(&state, "web").unwrap();
        assert_eq!(form.value("hostname").unwrap(), "web.example.org");
        assert_eq!(form.value("port").unwrap(), "22");

        form.set_value("name", "frontend").unwrap();
        form.set_value("auth", "password").unwrap();
        form.set_value("password", "s3cret").unwrap();
        assert_eq!(form.submit(&mut state), Ok(SubmitOutcome::Closed));

        let catalog = state.store.catalog();
        assert!(catalog.host("web").is_none());
        assert_eq!(
            catalog.host("frontend").unwrap().auth,
            AuthKind::Password {
                password: Some("s3cret".into())
            }
        );
        assert!(catalog.group("prod").unwrap().contains("frontend"));
    }

    #[test]
    fn hidden_credentials_are_dropped() {
        let mut values = FieldValues::new();
        for (k, v) in [
            ("name", "db"),
            ("hostname", "10.0.0.5"),
            ("port", "22"),
            ("user", ""),
            ("auth", "agent"),
            ("identity", "~/.ssh/id_rsa"),
            ("password", "pw"),
        ] {
            values.insert(k.into(), v.into());
        }
        let host = host_from_values(&values).unwrap();
        assert_eq!(host.auth, AuthKind::Agent);
        assert_eq!(host.user, None);
    }
}
