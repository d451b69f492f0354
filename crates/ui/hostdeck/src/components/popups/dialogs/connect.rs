use catalog::{CatalogError, Host, Layout};
use color_eyre::{Result, eyre::eyre};
use futures::FutureExt;
use strum::VariantNames;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    action::ConnectTarget,
    components::popups::form::{Commit, FieldValues, Form, FormField, FormFieldKind, FormSchema},
    services::tmux::{OpenTarget, Tmux},
    state::AppState,
};

use super::with_mode;

/// tmux window names may not contain the target separators.
fn window_name(value: &str) -> Result<(), String> {
    if value.contains([':', '.']) {
        Err("Must not contain ':' or '.'".into())
    } else {
        Ok(())
    }
}

/// What gets opened, resolved from the catalog when the dialog is built.
enum Plan {
    Host(Host),
    Profile {
        name: String,
        hosts: Vec<Host>,
        layout: Layout,
    },
}

fn plan(state: &AppState, target: &ConnectTarget) -> Result<Plan> {
    let catalog = state.store.catalog();
    match target {
        ConnectTarget::Host(name) => {
            let host = catalog
                .host(name)
                .ok_or_else(|| CatalogError::UnknownHost(name.clone()))?;
            Ok(Plan::Host(host.clone()))
        }
        ConnectTarget::Profile(name) => {
            let group = catalog
                .group(name)
                .ok_or_else(|| CatalogError::UnknownGroup(name.clone()))?;
            let hosts: Vec<Host> = catalog.members(name)?.into_iter().cloned().collect();
            if hosts.is_empty() {
                return Err(eyre!("profile `{name}` has no hosts"));
            }
            Ok(Plan::Profile {
                name: name.clone(),
                hosts,
                layout: group.layout,
            })
        }
    }
}

/// Open a host or profile in tmux. The commit hands the tmux work to the task
/// manager and keeps the dialog open until it reports back.
pub fn connect(state: &AppState, target: &ConnectTarget) -> Result<Form<AppState>> {
    let plan = plan(state, target)?;
    let title = match target {
        ConnectTarget::Host(name) => format!("Connect to `{name}`"),
        ConnectTarget::Profile(name) => format!("Open profile `{name}`"),
    };
    let schema = FormSchema::new(
        title,
        vec![
            FormField::new("window", "Window", FormFieldKind::Text)
                .required()
                .default_value(target.name())
                .validator(window_name),
            FormField::new("target", "Open in", FormFieldKind::select(OpenTarget::VARIANTS.iter().copied()))
                .help(format!("window: inside session `{}`", state.config.session_name)),
        ],
    )
    .submit_label("Connect")
    .min_size(56, 14);

    let liveness = CancellationToken::new();
    let token = liveness.clone();
    let form = Form::new(
        with_mode(schema, state),
        move |values: &FieldValues, state: &mut AppState| {
            let window = values["window"].trim().to_string();
            let open_in: OpenTarget = values["target"]
                .parse()
                .map_err(|_| format!("unknown target `{}`", values["target"]))?;
            let tmux = Tmux::new(&state.config);
            let session = state.config.session_name.clone();
            let id = state.next_task_id();

            let (label, work) = match &plan {
                Plan::Host(host) => {
                    let host = host.clone();
                    let label = format!("connecting to {}", host.name);
                    let work = async move {
                        tmux.open_host(&session, &window, &host, open_in)
                            .await
                            .map_err(|e| e.to_string())
                    };
                    (label, work.boxed())
                }
                Plan::Profile { name, hosts, layout } => {
                    let (name, hosts, layout) = (name.clone(), hosts.clone(), *layout);
                    let label = format!("opening {} host(s) of {name}", hosts.len());
                    let work = async move {
                        tmux.open_group(&session, &window, &name, &hosts, layout, open_in)
                            .await
                            .map_err(|e| e.to_string())
                    };
                    (label, work.boxed())
                }
            };

            state
                .tasks
                .spawn(id, label.clone(), token.child_token(), work)
                .map_err(|_| "task manager is not running".to_string())?;
            info!(id, %label, "connect started");
            Ok(Commit::Pending { label, ticket: id })
        },
        |_: &mut AppState| {},
    )?
    .with_liveness(liveness);
    Ok(form)
}
