#[macro_use]
extern crate rocket;

pub mod config;
pub mod error;
pub mod geocoder;
pub mod mail;
pub mod matching;
pub mod models;
pub mod normalize;
pub mod oracle;
pub mod pipeline;
pub mod realtime;
pub mod request_logger;
pub mod routes;
pub mod store;
pub mod supervisor;

use crate::config::PipelineConfig;
use crate::geocoder::{GoogleGeocoder, RemoteGeocoder};
use crate::mail::{GraphMailAdapter, MailSource};
use crate::oracle::{ExtractionOracle, OpenAiOracle};
use crate::realtime::LiveLog;
use crate::request_logger::RequestLogger;
use crate::store::Store;
use crate::supervisor::TaskSupervisor;
use env_logger::Env;
use rocket::fairing::AdHoc;
use rocket::http::Method;
use rocket::{Build, Rocket};
use rocket_cors::{AllowedOrigins, CorsOptions};
use rocket_okapi::{
    openapi_get_routes,
    rapidoc::{GeneralConfig, HideShowConfig, RapiDocConfig, make_rapidoc},
    settings::UrlObject,
    swagger_ui::{SwaggerUIConfig, make_swagger_ui},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::{Arc, Once};
use tera::Tera;

static LOGGER: Once = Once::new();

fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(
            Env::default().default_filter_or("info,rocket::server=warn,rocket::request=warn"),
        )
        .init();
    });
}

/// Builds the Rocket instance (§4.9, §6): loads configuration, then defers
/// the pool connection, migrations, and pipeline wiring to ignite fairings
/// so the whole bootstrap stays within Rocket's async runtime. A missing
/// required credential is a fatal startup error (§7) — there's no sensible
/// degraded mode without mailbox/store/oracle access.
pub fn rocket() -> Rocket<Build> {
    init_logger();
    log::info!("starting shipbroker pipeline");

    let config = match PipelineConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("fatal: invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    let templates = match Tera::new("templates/**/*") {
        Ok(tera) => Arc::new(tera),
        Err(err) => {
            log::error!("fatal: failed to load email templates: {err}");
            std::process::exit(1);
        }
    };

    let cors = CorsOptions::default()
        .allowed_origins(AllowedOrigins::all())
        .allowed_methods(
            vec![Method::Get, Method::Post]
                .into_iter()
                .map(From::from)
                .collect(),
        )
        .allow_credentials(true)
        .to_cors()
        .expect("error creating CORS");

    rocket::build()
        .attach(RequestLogger)
        .attach(cors)
        .manage(config.clone())
        .manage(templates.clone())
        .manage(LiveLog::new())
        .manage(TaskSupervisor::new())
        .attach(AdHoc::try_on_ignite("Connect Entity Store", |rocket| async move {
            let config = rocket
                .state::<PipelineConfig>()
                .expect("pipeline config is managed at startup")
                .clone();

            let pool = match PgPoolOptions::new()
                .max_connections(10)
                .connect(&config.database_url)
                .await
            {
                Ok(pool) => pool,
                Err(e) => {
                    log::error!("failed to connect to entity store: {e}");
                    return Err(rocket);
                }
            };

            if let Err(e) = store::run_migrations(&pool).await {
                log::error!("entity store migrations failed: {e}");
                return Err(rocket);
            }

            Ok(rocket.manage(pool.clone()).manage(Store::new(pool)))
        }))
        .attach(AdHoc::on_liftoff("Register Pipeline Stages", |rocket| {
            Box::pin(async move {
                let (Some(store), Some(supervisor), Some(log), Some(templates)) = (
                    rocket.state::<Store>().cloned(),
                    rocket.state::<TaskSupervisor>().cloned(),
                    rocket.state::<LiveLog>().cloned(),
                    rocket.state::<Arc<Tera>>().cloned(),
                ) else {
                    log::error!("failed to register pipeline stages: required state missing");
                    return;
                };
                let config = rocket
                    .state::<PipelineConfig>()
                    .expect("pipeline config is managed at startup")
                    .clone();

                let mail: Arc<dyn MailSource> = Arc::new(GraphMailAdapter::new(config.azure.clone()));
                let oracle: Arc<dyn ExtractionOracle> = Arc::new(OpenAiOracle::new(config.oracle.clone()));
                let geocoder: Arc<dyn RemoteGeocoder> =
                    Arc::new(GoogleGeocoder::new(config.geocoder.clone()));

                // Every Sender/SharedReceiver the registered closures need is already
                // cloned into them; the Queues handle itself has no further use.
                drop(pipeline::register(
                    &supervisor,
                    &config,
                    store,
                    mail,
                    oracle,
                    geocoder,
                    templates,
                    log,
                ));

                log::info!("pipeline stages registered; awaiting operator start commands");
            })
        }))
        .mount(
            "/api/v1",
            openapi_get_routes![
                routes::health::live_health,
                routes::health::ready_health,
                routes::control::control_task,
                routes::control::describe_tasks,
            ],
        )
        .mount("/api/v1", rocket::routes![routes::realtime::control_ws])
        .mount(
            "/api/docs/swagger/",
            make_swagger_ui(&SwaggerUIConfig {
                url: "../../v1/openapi.json".to_owned(),
                ..Default::default()
            }),
        )
        .mount(
            "/api/docs/rapidoc/",
            make_rapidoc(&RapiDocConfig {
                general: GeneralConfig {
                    spec_urls: vec![UrlObject::new("Shipbroker Pipeline API", "../../v1/openapi.json")],
                    ..Default::default()
                },
                hide_show: HideShowConfig {
                    allow_spec_url_load: false,
                    allow_spec_file_load: false,
                    ..Default::default()
                },
                ..Default::default()
            }),
        )
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use rocket::config::LogLevel;
    use rocket::figment::Figment;
    use rocket::local::asynchronous::Client as AsyncClient;
    use rocket::local::blocking::Client;
    use rocket::{Build, Rocket, Route};
    use sqlx::PgPool;

    pub use database::{TestDatabase, TestDatabaseError};

    pub mod database {
        use log::LevelFilter;
        use sqlx::migrate::Migrator;
        use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
        use sqlx::{self, ConnectOptions, PgPool};
        use testcontainers::{GenericImage, ImageExt, core::WaitFor};
        use testcontainers_modules::testcontainers::{
            ContainerAsync, core::error::TestcontainersError, runners::AsyncRunner,
        };
        use thiserror::Error;
        use tokio::runtime::Handle;
        use uuid::Uuid;

        static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

        #[derive(Debug, Error)]
        pub enum TestDatabaseError {
            #[error("TEST_DATABASE_URL not set")]
            MissingUrl,
            #[error("database error: {0}")]
            Sqlx(#[from] sqlx::Error),
            #[error("migration error: {0}")]
            Migration(#[from] sqlx::migrate::MigrateError),
            #[error("container error: {0}")]
            Container(#[from] TestcontainersError),
        }

        /// Ephemeral database factory for integration tests.
        pub struct TestDatabase {
            pool: Option<PgPool>,
            admin_options: PgConnectOptions,
            database_name: String,
            container: Option<ContainerAsync<GenericImage>>,
        }

        impl TestDatabase {
            pub async fn new_from_env() -> Result<Self, TestDatabaseError> {
                Self::new().await
            }

            pub async fn new() -> Result<Self, TestDatabaseError> {
                // `cube`/`earthdistance` (migration 0001) are contrib
                // modules bundled with the stock Postgres image — no
                // PostGIS install needed for this schema.
                let image = GenericImage::new("postgres", "16")
                    .with_wait_for(WaitFor::message_on_stdout(
                        "database system is ready to accept connections",
                    ))
                    .with_wait_for(WaitFor::message_on_stderr(
                        "database system is ready to accept connections",
                    ));

                let request = image
                    .with_env_var("POSTGRES_DB", "postgres")
                    .with_env_var("POSTGRES_USER", "postgres")
                    .with_env_var("POSTGRES_PASSWORD", "postgres");

                let container = request.start().await?;

                let host = container.get_host().await?.to_string();
                let port = container.get_host_port_ipv4(5432).await?;
                let admin_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

                let base_options: PgConnectOptions =
                    admin_url.parse().map_err(TestDatabaseError::Sqlx)?;
                let base_options = base_options.log_statements(LevelFilter::Off);

                let base_name = base_options
                    .get_database()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "postgres".to_string());

                let admin_options = base_options.clone().database("postgres");
                let admin_pool = PgPoolOptions::new()
                    .max_connections(1)
                    .connect_with(admin_options.clone())
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let new_db_name = format!("{}_{}", base_name, Uuid::new_v4().simple());
                let create_sql = format!("CREATE DATABASE \"{}\" TEMPLATE template0", new_db_name);
                sqlx::query(&create_sql)
                    .execute(&admin_pool)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                let pool = PgPoolOptions::new()
                    .max_connections(5)
                    .connect_with(base_options.clone().database(&new_db_name))
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                MIGRATOR.run(&pool).await?;

                Ok(Self {
                    pool: Some(pool),
                    admin_options,
                    database_name: new_db_name,
                    container: Some(container),
                })
            }

            pub fn pool(&self) -> &PgPool {
                self.pool.as_ref().expect("test database pool is available")
            }

            pub fn pool_clone(&self) -> PgPool {
                self.pool().clone()
            }

            pub async fn reset(&self) -> Result<(), TestDatabaseError> {
                MIGRATOR.run(self.pool()).await?;
                Ok(())
            }

            pub async fn close(mut self) -> Result<(), TestDatabaseError> {
                if let Some(pool) = self.pool.take() {
                    pool.close().await;
                }

                drop_database_with_fallback(self.admin_options.clone(), &self.database_name)
                    .await
                    .map_err(TestDatabaseError::Sqlx)?;

                if let Some(container) = self.container.take() {
                    drop(container);
                }

                Ok(())
            }
        }

        async fn drop_database_with_fallback(
            admin_options: PgConnectOptions,
            database_name: &str,
        ) -> Result<(), sqlx::Error> {
            let admin_pool = PgPoolOptions::new()
                .max_connections(1)
                .connect_with(admin_options)
                .await?;

            let drop_force = format!("DROP DATABASE \"{}\" WITH (FORCE)", database_name);
            match sqlx::query(&drop_force).execute(&admin_pool).await {
                Ok(_) => Ok(()),
                Err(err) if force_drop_unsupported(&err) => {
                    let drop_sql = format!("DROP DATABASE \"{}\"", database_name);
                    sqlx::query(&drop_sql).execute(&admin_pool).await?;
                    Ok(())
                }
                Err(err) => Err(err),
            }
        }

        fn force_drop_unsupported(err: &sqlx::Error) -> bool {
            matches!(
                err,
                sqlx::Error::Database(db_err)
                    if db_err
                        .code()
                        .map(|code| code == "42601" || code == "0A000")
                        .unwrap_or(false)
            )
        }

        impl Drop for TestDatabase {
            fn drop(&mut self) {
                if let Some(pool) = self.pool.take() {
                    let admin_options = self.admin_options.clone();
                    let db_name = self.database_name.clone();
                    if let Ok(handle) = Handle::try_current() {
                        handle.spawn(async move {
                            pool.close().await;
                            let _ =
                                drop_database_with_fallback(admin_options.clone(), &db_name).await;
                        });
                    } else {
                        std::thread::spawn(move || {
                            if let Ok(rt) = tokio::runtime::Runtime::new() {
                                rt.block_on(async move {
                                    pool.close().await;
                                    let _ = drop_database_with_fallback(
                                        admin_options.clone(),
                                        &db_name,
                                    )
                                    .await;
                                });
                            }
                        });
                    }
                }

                if let Some(container) = self.container.take() {
                    drop(container);
                }
            }
        }
    }

    /// Builder for constructing Rocket instances tailored for integration tests.
    #[derive(Default)]
    pub struct TestRocketBuilder {
        figment: Figment,
        mounts: Vec<(String, Vec<Route>)>,
        pg_pool: Option<PgPool>,
    }

    impl TestRocketBuilder {
        pub fn new() -> Self {
            let figment = rocket::Config::figment()
                .merge(("port", 0))
                .merge(("log_level", LogLevel::Off))
                .merge(("cli_colors", false));

            Self {
                figment,
                mounts: Vec::new(),
                pg_pool: None,
            }
        }

        pub fn mount_api_routes(mut self, routes: Vec<Route>) -> Self {
            self.mounts.push(("/api/v1".to_string(), routes));
            self
        }

        pub fn manage_pg_pool(mut self, pool: PgPool) -> Self {
            self.pg_pool = Some(pool);
            self
        }

        pub fn build(self) -> Rocket<Build> {
            let mut rocket = rocket::custom(self.figment);

            for (base, routes) in self.mounts {
                rocket = rocket.mount(base, routes);
            }

            if let Some(pool) = self.pg_pool {
                rocket = rocket.manage(pool);
            }

            rocket
        }

        pub fn blocking_client(self) -> Client {
            Client::tracked(self.build()).expect("valid Rocket instance")
        }

        pub async fn async_client(self) -> AsyncClient {
            AsyncClient::tracked(self.build())
                .await
                .expect("valid Rocket instance")
        }
    }
}
