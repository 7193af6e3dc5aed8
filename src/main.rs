use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local;
use env_logger::{Env, Target};
use std::io::Write;
use std::sync::Arc;

use evuka_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::{PaystackClient, TransferGateway},
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::JwtService,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    let config = Config::from_toml().expect("Failed to load configuration");

    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.access_token_expires_in);

    let paystack = PaystackClient::new(config.paystack.clone());
    let gateway: Arc<dyn TransferGateway> = Arc::new(paystack.clone());

    let currency = config.ledger.currency.clone();
    let wallet_service = WalletService::new(pool.clone(), currency.clone());
    let settlement_service = SettlementService::new(pool.clone(), config.ledger.clone());
    let payout_service = PayoutService::new(
        pool.clone(),
        gateway,
        config.payouts.clone(),
        currency.clone(),
    );
    let payment_service = PaymentService::new(pool.clone());

    // create the platform wallet up front so the first settlement does not race for it
    match settlement_service.platform_wallet().await {
        Ok(wallet) => log::info!("Platform wallet {} ready", wallet.id),
        Err(e) => log::error!("Failed to prepare platform wallet: {e}"),
    }

    tasks::spawn_all(payout_service.clone(), config.payouts.interval_secs);

    log::info!(
        "Starting HTTP server at {}:{} (fee rate {}, currency {})",
        config.server.host,
        config.server.port,
        config.ledger.platform_fee_rate,
        currency
    );

    HttpServer::new(move || {
        App::new()
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .wrap(create_cors())
            .wrap(Logger::default())
            .app_data(web::Data::new(wallet_service.clone()))
            .app_data(web::Data::new(settlement_service.clone()))
            .app_data(web::Data::new(payout_service.clone()))
            .app_data(web::Data::new(payment_service.clone()))
            .app_data(web::Data::new(paystack.clone()))
            .configure(swagger_config)
            .configure(handlers::webhook_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::wallet_config)
                    .configure(handlers::payment_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
