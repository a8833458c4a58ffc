//! # Billing service
//!
//! Cancels and deletes bill runs, manages two-part-tariff review licences and
//! proxies address lookups.
//!
//! ## Environment variables
//!
//! | Name | Required | Description |
//! |------|----------|-------------|
//! | `SERVICE_HOST` | No | Bind address (default `0.0.0.0`) |
//! | `SERVICE_PORT` | **Yes** | Port |
//! | `DATABASE_URL` | **Yes** | PostgreSQL connection URL |
//! | `CHARGING_MODULE_URL` | **Yes** | Charging module API base URL |
//! | `CHARGING_MODULE_TOKEN_URL` | No | Identity provider for client credentials |
//! | `CHARGING_MODULE_CLIENT_ID` | No | Client credentials id |
//! | `CHARGING_MODULE_CLIENT_SECRET` | No | Client credentials secret |
//! | `CHARGING_MODULE_TOKEN` | When no client credentials | Static bearer token |
//! | `ADDRESS_FACADE_URL` | **Yes** | Address facade base URL |
//! | `REQUEST_TIMEOUT_MS` | No | Outbound request timeout (default 5000) |
//! | `LONG_REQUEST_TIMEOUT_MS` | No | Charge calculation timeout (default 30000) |
//! | `ADDRESS_FACADE_TIMEOUT_MS` | No | Postcode lookup timeout (default 3000) |
//! | `HTTP_PROXY` | No | Forward proxy for outbound requests |
//! | `LOG_FORMAT` | No | `json` or `pretty` (default) |
//!
//! ## Running
//!
//! ```bash
//! SERVICE_PORT=8013 DATABASE_URL=postgres://... cargo run -p abstraction-billing-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use abstraction_billing_infra::{
    Notifier,
    TracingNotifier,
    address_facade::AddressFacadeClientImpl,
    charging_module::{
        ChargingModuleClientImpl,
        ClientCredentialsTokenProvider,
        StaticTokenProvider,
        TokenProvider,
    },
    db,
    deletion::DeletionRegistry,
    repository::{
        PostgresBillRunRepository,
        PostgresBillingRecordsRepository,
        PostgresReviewDataRepository,
    },
    request::{RequestClient, RequestConfig},
};
use abstraction_billing_service::{
    app,
    config::{ChargingModuleAuth, ServiceConfig},
    handler::{AddressState, BillRunState},
    usecase::{BillRunUseCaseImpl, DeleteBillRunUseCase},
};
use abstraction_billing_shared::observability::{TracingConfig, init_tracing};
use anyhow::Context;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("billing-service"));

    let config = ServiceConfig::from_env().context("failed to load configuration")?;

    tracing::info!("starting billing service on {}:{}", config.host, config.port);

    let pool = db::create_pool(&config.database_url)
        .await
        .context("failed to connect to the database")?;
    db::run_migrations(&pool)
        .await
        .context("failed to run migrations")?;
    tracing::info!("connected to the database");

    let notifier: Arc<dyn Notifier> = Arc::new(TracingNotifier);

    // Outbound HTTP
    let request = Arc::new(RequestClient::new(
        RequestConfig {
            timeout: config.request_timeout,
            proxy: config.http_proxy.clone(),
            ..RequestConfig::default()
        },
        notifier.clone(),
    )?);
    let tokens: Arc<dyn TokenProvider> = match config.charging_module_auth.clone() {
        ChargingModuleAuth::ClientCredentials(credentials) => Arc::new(
            ClientCredentialsTokenProvider::new(request.clone(), credentials),
        ),
        ChargingModuleAuth::Static(token) => Arc::new(StaticTokenProvider::new(token)),
    };
    let charging_module = Arc::new(ChargingModuleClientImpl::new(
        &config.charging_module_url,
        request.clone(),
        tokens,
        config.long_request_timeout,
    ));
    let address_facade = Arc::new(AddressFacadeClientImpl::new(
        &config.address_facade_url,
        request,
        config.address_facade_timeout,
    ));

    // Repositories
    let bill_run_repository = Arc::new(PostgresBillRunRepository::new(pool.clone()));
    let review_repository = Arc::new(PostgresReviewDataRepository::new(pool.clone()));
    let billing_records_repository = Arc::new(PostgresBillingRecordsRepository::new(pool));

    // Bill run deletion
    let registry = DeletionRegistry::with_all_deleters(
        charging_module,
        review_repository.clone(),
        billing_records_repository,
    );
    let deletion = Arc::new(DeleteBillRunUseCase::new(registry, notifier));

    let bill_run_state = Arc::new(BillRunState {
        usecase: BillRunUseCaseImpl::new(bill_run_repository, review_repository, deletion),
    });
    let address_state = Arc::new(AddressState {
        client: address_facade,
    });

    let app = app::router(bill_run_state, address_state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("invalid bind address")?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("billing service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
