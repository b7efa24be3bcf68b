//! Dispatches a `Greet` command and a `GetCount` query, sync and async,
//! inside one request scope.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use clap::Parser;
use rebar_core::{
    AsyncCommandHandler, AsyncQueryHandler, CancellationSignal, Command, CommandHandler, Query,
    QueryHandler, QueryResponse,
};
use rebar_dispatch::logging::init_tracing;
use rebar_dispatch::{
    DispatchConfig, Dispatchers, DuplicatePolicy, HandlerLifetime, HandlerModule, HandlerRegistry,
    LoggingConfig, RegistryConfig, RegistryError, ShutdownCancellation,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "rebar-demo")]
#[command(about = "Dispatch a command and a query through Rebar")]
#[command(version)]
struct Args {
    /// Log filter directives (overridden by RUST_LOG)
    #[arg(long, env = "REBAR_LOG", default_value = "info")]
    log_filter: String,

    /// Emit JSON log lines
    #[arg(long)]
    json: bool,

    /// Let later registrations replace earlier ones
    #[arg(long)]
    replace_duplicates: bool,

    /// Name carried by the Greet command
    #[arg(long, default_value = "Alice")]
    name: String,

    /// Value the GetCount handler answers with
    #[arg(long, default_value_t = 42)]
    count: i64,
}

impl Args {
    fn config(&self) -> DispatchConfig {
        DispatchConfig {
            registry: RegistryConfig {
                duplicate_policy: if self.replace_duplicates {
                    DuplicatePolicy::Replace
                } else {
                    DuplicatePolicy::Reject
                },
            },
            logging: LoggingConfig {
                filter: self.log_filter.clone(),
                json: self.json,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Requests and handlers
// ---------------------------------------------------------------------------

struct Greet {
    name: String,
}
impl Command for Greet {}

struct GetCount;

struct CountResponse {
    value: i64,
}
impl QueryResponse for CountResponse {}
impl Query<CountResponse> for GetCount {}

struct GreetHandler;

impl CommandHandler<Greet> for GreetHandler {
    fn execute(&self, command: &Greet) -> anyhow::Result<()> {
        info!(name = %command.name, "hello");
        Ok(())
    }
}

#[async_trait]
impl AsyncCommandHandler<Greet> for GreetHandler {
    async fn execute_async(
        &self,
        command: &Greet,
        signal: CancellationSignal,
    ) -> anyhow::Result<()> {
        signal.check()?;
        info!(name = %command.name, "hello (async)");
        Ok(())
    }
}

struct CountHandler {
    value: Arc<AtomicI64>,
}

impl QueryHandler<GetCount, CountResponse> for CountHandler {
    fn execute(&self, _query: &GetCount) -> anyhow::Result<CountResponse> {
        Ok(CountResponse {
            value: self.value.load(Ordering::Relaxed),
        })
    }
}

#[async_trait]
impl AsyncQueryHandler<GetCount, CountResponse> for CountHandler {
    async fn execute_async(
        &self,
        query: &GetCount,
        signal: CancellationSignal,
    ) -> anyhow::Result<CountResponse> {
        signal.check()?;
        QueryHandler::execute(self, query)
    }
}

struct DemoModule {
    count: Arc<AtomicI64>,
}

impl HandlerModule for DemoModule {
    fn register(&self, registry: &HandlerRegistry) -> Result<(), RegistryError> {
        registry.register_command_instance::<Greet, _>(GreetHandler)?;
        registry.register_async_command_instance::<Greet, _>(GreetHandler)?;

        let sync_count = Arc::clone(&self.count);
        registry.register_query::<GetCount, CountResponse, _, _>(
            HandlerLifetime::Scoped,
            move || CountHandler {
                value: Arc::clone(&sync_count),
            },
        )?;
        let async_count = Arc::clone(&self.count);
        registry.register_async_query::<GetCount, CountResponse, _, _>(
            HandlerLifetime::Transient,
            move || CountHandler {
                value: Arc::clone(&async_count),
            },
        )
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = args.config();
    init_tracing(&config.logging)?;

    let registry = HandlerRegistry::with_config(config.registry);
    registry.install(&DemoModule {
        count: Arc::new(AtomicI64::new(args.count)),
    })?;
    let registry = Arc::new(registry);
    info!(contracts = ?registry.contracts(), "handlers registered");

    let shutdown = Arc::new(ShutdownCancellation::new());
    {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                shutdown.trigger("ctrl-c");
            }
        });
    }

    let scope = Arc::new(shutdown.request_scope());
    info!(scope_id = %scope.id(), "request started");
    let dispatchers = Dispatchers::for_scope(&registry, Arc::clone(&scope));

    let greet = Greet { name: args.name };
    dispatchers.commands().send(&greet)?;
    dispatchers.commands().send_async(&greet).await?;

    let count: CountResponse = dispatchers.queries().ask(&GetCount)?;
    info!(value = count.value, "count (sync)");

    match dispatchers
        .queries()
        .ask_async::<GetCount, CountResponse>(&GetCount)
        .await
    {
        Ok(count) => info!(value = count.value, "count (async)"),
        Err(err) if err.is_cancelled() => warn!(error = %err, "query cancelled"),
        Err(err) => return Err(err.into()),
    }

    info!(scope_id = %scope.id(), "request finished");
    Ok(())
}
