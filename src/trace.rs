use anyhow::Result;
use opentelemetry::global;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

const SERVICE_NAME: &str = "cname-reconciler";

/// Log to stderr, filtered by `RUST_LOG`; also export spans when a Jaeger
/// agent is configured.
pub fn init_tracing(jaeger_agent: Option<&str>) -> Result<()> {
    let trace = match jaeger_agent {
        None => None,
        Some(agent_addr) => {
            global::set_text_map_propagator(opentelemetry_jaeger::Propagator::new());

            let tracer = opentelemetry_jaeger::new_pipeline()
                .with_service_name(SERVICE_NAME)
                .with_agent_endpoint(agent_addr)
                .install_simple()?;

            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
    };

    let stderr_subscriber = tracing_subscriber::fmt::layer().pretty().with_target(true);
    let env_filter = tracing_subscriber::filter::EnvFilter::from_default_env();

    let subscriber = Registry::default()
        .with(env_filter)
        .with(trace)
        .with(stderr_subscriber);

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

pub fn stop_tracing() {
    global::shutdown_tracer_provider();
}
