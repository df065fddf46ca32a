use warp::{reject::Rejection, Filter};

use crate::{
    actions::get_user_by_id,
    error::{Error, HtmlError},
    jwt::SessionData,
    state::{with_state, AppState},
};

/// Pulls the token out of an `Authorization: Bearer <token>` or
/// `Authorization: Token <token>` header.
pub fn parse_authorization(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    if token.is_empty() {
        return None;
    }

    if scheme.eq_ignore_ascii_case("bearer") || scheme.eq_ignore_ascii_case("token") {
        Some(token)
    } else {
        None
    }
}

pub async fn authenticate(header: Option<String>, state: &AppState) -> Result<SessionData, Error> {
    let header = header.ok_or_else(|| HtmlError::Unauthorized.default())?;
    let token = parse_authorization(&header).ok_or_else(|| HtmlError::InvalidSession.default())?;
    let session = state.keys.verify_jwt_session(token)?;

    match get_user_by_id(&state.pool, session.user_id).await? {
        Some(user) if user.is_active => Ok(SessionData::from(&user)),
        _ => Err(HtmlError::InvalidSession.new("User inactive or deleted.")),
    }
}

/// Resolves the calling user, rejecting with 401 when the request carries
/// no valid token.
pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (SessionData,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: AppState| async move {
            authenticate(header, &state).await.map_err(Rejection::from)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bearer_and_token_schemes() {
        assert_eq!(parse_authorization("Bearer abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("Token abc.def"), Some("abc.def"));
        assert_eq!(parse_authorization("token   abc"), Some("abc"));
    }

    #[test]
    fn rejects_other_schemes() {
        assert_eq!(parse_authorization("Basic dXNlcjpwYXNz"), None);
        assert_eq!(parse_authorization("Bearer"), None);
        assert_eq!(parse_authorization("Bearer   "), None);
    }
}
