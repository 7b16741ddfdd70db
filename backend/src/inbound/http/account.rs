//! Account and catalog endpoints.
//!
//! ```text
//! GET /api/v1/users/me
//! GET /api/v1/credit-packages
//! GET /api/v1/styles
//! ```

use actix_web::{HttpResponse, get, web};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{AvatarStyle, CreditPackage, UserAccount};
use crate::inbound::http::ApiResult;
use crate::inbound::http::cache_control::private_no_cache_header;
use crate::inbound::http::generations_dto::StyleBody;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// The caller's credit account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountBody {
    /// Account identifier.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    pub id: String,
    /// Remaining credits.
    #[schema(example = 15)]
    pub credits: u32,
}

impl From<UserAccount> for AccountBody {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id.to_string(),
            credits: account.credits,
        }
    }
}

/// A purchasable credit bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditPackageBody {
    /// Package identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: String,
    /// Credits granted.
    pub credits: u32,
    /// Extra credits on top.
    pub bonus: u32,
    /// Price in cents.
    pub price: u32,
}

impl From<CreditPackage> for CreditPackageBody {
    fn from(package: CreditPackage) -> Self {
        Self {
            id: package.id.to_string(),
            credits: package.credits,
            bonus: package.bonus,
            price: package.price_cents,
        }
    }
}

/// Current user's balance.
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    responses(
        (status = 200, description = "Account", body = AccountBody),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "No account yet", body = ErrorSchema)
    ),
    tags = ["account"],
    operation_id = "currentAccount",
    security(("SessionCookie" = []))
)]
#[get("/users/me")]
pub async fn current_account(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<HttpResponse> {
    let user_id = session.require_user_id()?;
    let account = state.accounts.current_account(&user_id).await?;
    Ok(HttpResponse::Ok()
        .insert_header(private_no_cache_header())
        .json(AccountBody::from(account)))
}

/// Credit packages, smallest first.
#[utoipa::path(
    get,
    path = "/api/v1/credit-packages",
    responses(
        (status = 200, description = "Package catalog", body = [CreditPackageBody]),
        (status = 503, description = "Store unavailable", body = ErrorSchema)
    ),
    tags = ["account"],
    operation_id = "listCreditPackages",
    security([])
)]
#[get("/credit-packages")]
pub async fn credit_packages(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<Vec<CreditPackageBody>>> {
    let packages = state.accounts.credit_packages().await?;
    Ok(web::Json(
        packages.into_iter().map(CreditPackageBody::from).collect(),
    ))
}

/// Supported avatar styles.
#[utoipa::path(
    get,
    path = "/api/v1/styles",
    responses((status = 200, description = "Style catalog", body = [StyleBody])),
    tags = ["generations"],
    operation_id = "listStyles",
    security([])
)]
#[get("/styles")]
pub async fn styles() -> web::Json<Vec<StyleBody>> {
    web::Json(AvatarStyle::ALL.into_iter().map(StyleBody::from).collect())
}
