use std::sync::Arc;

use vigil::config::Config;
use vigil::context::{Context, ContextError};
use vigil::http::response::Response;
use vigil::http::router::{handler_fn, Router};
use vigil::http::middleware::{logging_middleware, recovery_middleware, timeout_middleware};
use vigil::logging::TracingLogger;
use vigil::ports::{Logger, SystemClock};
use vigil::server::runtime::{RuntimeSettings, ServerRuntime};
use vigil::server::tls::{TlsListener, TlsSettings};
use vigil::service::{Service, ServiceError, ServiceInput, ServiceOutput, service_handler};

/// Echoes the request body back; rejects empty payloads.
struct EchoService;

impl Service for EchoService {
    fn handle(&self, _ctx: &Context, input: ServiceInput) -> Result<ServiceOutput, ServiceError> {
        if input.body.is_empty() {
            return Err(ServiceError::BadRequest);
        }
        Ok(ServiceOutput {
            body: input.body.to_vec(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(tracing::Level::INFO)
        .init();

    let cfg = Config::from_env()?;

    let logger: Arc<dyn Logger> = Arc::new(TracingLogger::new());
    let router = Arc::new(Router::new());

    router.use_middleware(logging_middleware(logger.clone(), Arc::new(SystemClock)));
    router.use_middleware(timeout_middleware(cfg.request_timeout));
    router.use_middleware(recovery_middleware(logger.clone()));

    router.register(
        "GET",
        "/health",
        handler_fn(|_req| async { Response::text(200, "ok") }),
    );
    router.register(
        "GET",
        "/hello",
        handler_fn(|_req| async { Response::text(200, "hello") }),
    );
    router.register(
        "GET",
        "/",
        handler_fn(|_req| async { Response::text(200, "ok") }),
    );
    router.register("POST", "/echo", service_handler(Arc::new(EchoService)));

    let tls = TlsSettings::new(&cfg.tls_cert_file, &cfg.tls_key_file, cfg.tls_min_version);
    let listener = TlsListener::bind(&cfg.listen_addr, &tls).await?;

    logger.info(
        "server listening",
        &[
            ("address", cfg.listen_addr.clone()),
            ("tls_min_version", cfg.tls_min_version.label().to_string()),
        ],
    );

    let ctx = Context::new();
    tokio::spawn({
        let ctx = ctx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown signal received");
                ctx.cancel(ContextError::Cancelled);
            }
        }
    });

    let runtime = ServerRuntime::new(
        listener,
        router,
        logger,
        RuntimeSettings {
            read_timeout: cfg.read_timeout,
            write_timeout: cfg.write_timeout,
            shutdown_deadline: cfg.shutdown_deadline,
        },
    );
    runtime.serve(ctx).await;

    Ok(())
}
