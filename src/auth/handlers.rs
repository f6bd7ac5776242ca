use axum::{
    extract::{FromRef, State},
    routing::post,
    Form, Json, Router,
};
use tracing::{info, instrument, warn};

use crate::auth::dto::{LoginForm, Token};
use crate::auth::jwt::JwtKeys;
use crate::errors::AppError;
use crate::state::AppState;
use crate::users::repo::UserRepo;

pub fn login_routes() -> Router<AppState> {
    Router::new().route("/login/access-token", post(login))
}

/// OAuth2-compatible token login. Unknown email and wrong password are
/// rejected identically.
#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<Token>, AppError> {
    let email = form.username.trim().to_lowercase();

    let user = UserRepo::new()
        .authenticate(&state.db, &email, &form.password)
        .await?
        .ok_or_else(|| {
            warn!(email = %email, "login failed");
            AppError::Forbidden("Incorrect email or password".into())
        })?;

    if !user.is_active {
        return Err(AppError::BadRequest("Inactive user".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access_token = keys.sign(user.id)?;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(Token::bearer(access_token)))
}
