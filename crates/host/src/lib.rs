//! Host process: composes the bundled feature modules into one platform.

use anyhow::Context;

use agora_communities::CommunitiesModule;
use agora_infra::{Configuration, ModuleRegistrar, ServiceProvider};
use agora_notifications::NotificationsModule;
use agora_observability::{LogFormat, ObservabilityConfig};

/// The bundled modules, in registration order.
///
/// Notifications reads the community directory, so communities comes first.
pub fn modules() -> ModuleRegistrar {
    ModuleRegistrar::default()
        .with_module(CommunitiesModule::new())
        .with_module(NotificationsModule::new())
}

/// `log.filter` (default `info`) and `log.format` (`json` | `pretty`, default `json`).
pub fn observability_config(config: &Configuration) -> anyhow::Result<ObservabilityConfig> {
    let mut observability = ObservabilityConfig::default();
    if let Some(filter) = config.get("log.filter") {
        observability.default_filter = filter.to_string();
    }
    observability.format = config.get_or("log.format", LogFormat::Json)?;
    Ok(observability)
}

/// Start observability and compose the platform from `config`.
pub fn bootstrap(config: &Configuration) -> anyhow::Result<ServiceProvider> {
    agora_observability::init(&observability_config(config)?);

    let registrar = modules();
    let provider = registrar
        .compose(config)
        .context("platform bootstrap failed")?;

    for subscription in provider.subscriptions() {
        tracing::info!(
            event_type = subscription.event_type,
            handlers = ?subscription.handlers,
            "event subscription"
        );
    }
    Ok(provider)
}
