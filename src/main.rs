use dreambid::{app, db, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    app::init_tracing();

    let app_state = AppState::init().await?;

    if app_state.config.db_bootstrap {
        if let Err(e) = db::bootstrap(&app_state.db).await {
            tracing::warn!(error = %e, "database bootstrap failed; continuing");
        }
    }

    app::serve(app::build_app(app_state)).await
}
