use std::{convert::Infallible, net::SocketAddr};

use log::{info, warn};
use tokio::signal::{self, ctrl_c};
use warp::{reply::Reply, Filter};

use crate::{
    error::handle_rejection,
    routes,
    schema::AttributeKind,
    state::AppState,
};

/// Every endpoint of the service, with error recovery and access logging.
pub fn routes(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let api = routes::users::routes(state.clone())
        .or(routes::recipes::routes(state.clone()))
        .or(routes::attributes::routes(state.clone(), AttributeKind::Tag))
        .or(routes::attributes::routes(state.clone(), AttributeKind::Ingredient))
        .or(routes::favorites::routes(state.clone()))
        .or(routes::docs::routes(state.clone()))
        .or(routes::media::routes(&state.config));

    api.recover(handle_rejection)
        .with(warp::log("recipe_api::http"))
}

pub async fn start_server(state: AppState) -> Result<SocketAddr, warp::Error> {
    let address = state.config.bind_address;
    info!("Binding to {address}");

    let (address, server) = warp::serve(routes(state))
        .try_bind_with_graceful_shutdown(address, shutdown_signal())?;
    info!("Server running on {address}");

    server.await;
    info!("Server shut down");

    Ok(address)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }

        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut terminate) => {
                terminate.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                warn!("Failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
