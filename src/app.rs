/*
 * Responsibility
 * - Config読み込み → 依存生成 (encoder / stores / providers / filter chain)
 * - Router 組み立て + Middleware の適用 (security, http)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use axum::{
    Router,
    routing::{get, post},
};
use chrono::TimeDelta;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::{health::health, ott::ott_generate};
use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::filter::{
    AuthenticationConverter, AuthenticationFilter, BearerTokenConverter, Filter,
    FilterChainProxy, GenerateOneTimeTokenFilter, OneTimeTokenQueryConverter,
    RedirectGeneratedOneTimeTokenHandler, UsernamePasswordHeaderConverter,
};
use crate::middleware;
use crate::repos::{InMemoryRefreshTokenRepo, InMemoryUserRepo};
use crate::security::SecurityContextHolder;
use crate::services::auth::{
    AuthenticationManager, AuthenticationProvider, BearerTokenAuthenticationProvider,
    DaoAuthenticationProvider, JwtIssuer, OneTimeTokenAuthenticationProvider, ProviderManager,
    TokenService, TracingEventPublisher, UserDetails,
};
use crate::services::ott::{InMemoryOneTimeTokenService, OneTimeTokenService};
use crate::services::password::{PasswordEncoder, create_delegating_password_encoder};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,auth_core=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panic via tracing so they don't get "lost".
        tracing::error!(?info, "panic");

        // In development, fail fast. In production, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<(), AppError> {
    init_tracing();
    let config = Config::from_env()?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting auth core in {:?} mode on {} (context strategy: {})",
        config.app_env,
        config.addr,
        config.security_context_strategy
    );

    let state = build_state(&config).await?;
    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, addr = %config.addr, "failed to bind");
            AppError::Internal
        })?;
    axum::serve(listener, app).await.map_err(|e| {
        tracing::error!(error = %e, "server error");
        AppError::Internal
    })?;

    Ok(())
}

pub async fn build_state(config: &Config) -> Result<AppState, AppError> {
    let encoder: Arc<dyn PasswordEncoder> = Arc::new(create_delegating_password_encoder(
        &config.password_encoding_id,
    )?);

    let users = Arc::new(InMemoryUserRepo::new());
    for seed in &config.seed_users {
        let encoded = encoder.encode(&seed.password).map_err(|e| {
            tracing::error!(error = %e, username = %seed.username, "failed to encode seed user");
            AppError::Internal
        })?;
        users.insert(
            UserDetails::new(seed.username.as_str(), encoded)
                .with_authorities(seed.authorities.iter().cloned()),
        );
    }
    tracing::info!(count = users.len(), "seeded users");

    let jwt = JwtIssuer::new(
        config.jwt_secret.as_bytes(),
        config.access_token_ttl_seconds,
        config.access_token_leeway_seconds,
    )
    .map_err(|e| {
        tracing::error!(error = %e, "invalid JWT settings");
        AppError::Internal
    })?;
    let tokens = Arc::new(TokenService::new(
        jwt,
        Arc::new(InMemoryRefreshTokenRepo::new()),
        config.refresh_token_ttl_seconds,
    ));

    let ott_ttl = i64::try_from(config.ott_ttl_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .ok_or(ConfigError::Invalid("OTT_TTL_SECONDS"))?;
    let one_time_tokens: Arc<dyn OneTimeTokenService> =
        Arc::new(InMemoryOneTimeTokenService::new().with_ttl(ott_ttl));

    let providers: Vec<Arc<dyn AuthenticationProvider>> = vec![
        Arc::new(
            DaoAuthenticationProvider::new(users.clone(), encoder)
                .with_password_updater(users.clone())
                .hide_user_not_found(config.hide_user_not_found),
        ),
        Arc::new(OneTimeTokenAuthenticationProvider::new(
            one_time_tokens.clone(),
            users,
        )),
        Arc::new(BearerTokenAuthenticationProvider::new(tokens.clone())),
    ];
    let manager: Arc<dyn AuthenticationManager> = Arc::new(
        ProviderManager::new(providers).with_event_publisher(Arc::new(TracingEventPublisher)),
    );

    let security = build_security(
        manager.clone(),
        one_time_tokens.clone(),
        SecurityContextHolder::new(config.security_context_strategy),
        &config.skip_paths,
    )?;

    Ok(AppState::new(
        tokens,
        manager,
        one_time_tokens,
        Arc::new(security),
    ))
}

/// Filter order: one-time-token generation, bearer, username/password
/// headers, one-time-token query, then the authorization gate.
pub fn build_security(
    manager: Arc<dyn AuthenticationManager>,
    one_time_tokens: Arc<dyn OneTimeTokenService>,
    holder: SecurityContextHolder,
    skip_paths: &[String],
) -> Result<FilterChainProxy, AppError> {
    let generate = GenerateOneTimeTokenFilter::new(
        one_time_tokens,
        Arc::new(RedirectGeneratedOneTimeTokenHandler::default()),
    )
    .map_err(|e| {
        tracing::error!(error = %e, "invalid one-time token request matcher");
        AppError::Internal
    })?;

    let converters: [Arc<dyn AuthenticationConverter>; 3] = [
        Arc::new(BearerTokenConverter),
        Arc::new(UsernamePasswordHeaderConverter),
        Arc::new(OneTimeTokenQueryConverter),
    ];

    let mut filters: Vec<Arc<dyn Filter>> = vec![Arc::new(generate)];
    filters.extend(converters.into_iter().map(|converter| {
        Arc::new(AuthenticationFilter::new(
            converter,
            manager.clone(),
            holder.clone(),
        )) as Arc<dyn Filter>
    }));

    FilterChainProxy::new(filters, holder)
        .with_skip_paths(skip_paths)
        .map_err(|e| {
            tracing::error!(error = %e, "invalid skip path pattern");
            AppError::Internal
        })
}

pub fn build_router(state: AppState) -> Router {
    let router = Router::new()
        .route("/health", get(health))
        .route("/ott/generate", post(ott_generate))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state.clone());

    let router = middleware::security::apply(router, state);
    middleware::http::apply(router)
}
