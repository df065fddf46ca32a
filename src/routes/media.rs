use warp::{filters::BoxedFilter, reply::Reply, Filter};

use super::filters::boxed_reply;
use crate::config::Config;

/// Serves uploaded files from `MEDIA_ROOT` under the `MEDIA_URL` prefix.
pub fn routes(config: &Config) -> BoxedFilter<(Box<dyn Reply>,)> {
    let prefix = config
        .media_segments()
        .into_iter()
        .fold(warp::any().boxed(), |filter, segment| {
            filter.and(warp::path(segment)).boxed()
        });

    prefix
        .and(warp::get())
        .and(warp::fs::dir(config.media_root.clone()))
        .map(boxed_reply)
        .boxed()
}
