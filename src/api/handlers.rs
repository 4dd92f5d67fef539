use crate::{
    api::models::*,
    auth::jwt::Claims,
    core::{
        errors::LedgerError,
        models::audit::{AppLog, TripAudit},
        models::trip::Trip,
        services::{ExpenseUpdate, LedgerService, NewExpense},
    },
    infrastructure::{
        cache::in_memory::InMemoryCache, logging::in_memory::InMemoryLogging, storage::in_memory::InMemoryStorage,
    },
};
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use http::header;

use std::sync::Arc;

pub type AppService = LedgerService<InMemoryLogging, InMemoryStorage, InMemoryCache>;

// Middleware to validate JWT
async fn auth_middleware(
    State(service): State<Arc<AppService>>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| LedgerError::Unauthorized("Missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| LedgerError::Unauthorized("Invalid Authorization header".to_string()))?;

    let claims = service.validate_token(token)?;
    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

// Define API routes
pub fn api_routes(service: Arc<AppService>) -> Router {
    let protected_routes = Router::new()
        .route("/travelers/{traveler_id}", get(get_traveler))
        .route("/trips", post(create_trip))
        .route("/trips/{trip_id}", get(get_trip).delete(delete_trip))
        .route("/trips/{trip_id}/members", post(add_member))
        .route("/trips/{trip_id}/members/{traveler_id}", delete(remove_member))
        .route("/trips/{trip_id}/expenses/equal", post(create_equal_split_expense))
        .route(
            "/trips/{trip_id}/expenses",
            post(create_custom_split_expense).get(list_expenses),
        )
        .route("/trips/{trip_id}/balances", get(get_balances))
        .route("/trips/{trip_id}/settlements", get(get_settlement_plan))
        .route("/trips/{trip_id}/audits", get(get_trip_audits))
        .route(
            "/expenses/{expense_id}",
            get(get_expense_details).put(modify_expense).delete(delete_expense),
        )
        .route("/expenses/{expense_id}/total_cost", patch(modify_expense_total_cost))
        .route("/expenses/{expense_id}/convert", post(convert_expense_type))
        .route("/logs", get(get_app_logs))
        .route_layer(middleware::from_fn_with_state(service.clone(), auth_middleware));

    Router::new()
        .route("/login", post(login))
        .route("/travelers", post(register_traveler)) // Unprotected
        .merge(protected_routes)
        .with_state(service)
}

#[utoipa::path(
    post,
    path = "/api/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 401, description = "Invalid credentials", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(service): State<Arc<AppService>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let token = service.authenticate(&req.email, &req.password).await?;
    Ok(Json(LoginResponse { token }))
}

#[utoipa::path(
    post,
    path = "/api/travelers",
    request_body = RegisterTravelerRequest,
    responses(
        (status = 201, description = "Traveler registered", body = TravelerResponse),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
pub(crate) async fn register_traveler(
    State(service): State<Arc<AppService>>,
    Json(req): Json<RegisterTravelerRequest>,
) -> Result<(StatusCode, Json<TravelerResponse>), ApiError> {
    let traveler = service
        .register_traveler(&req.name, &req.email, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(traveler.into())))
}

#[utoipa::path(
    get,
    path = "/api/travelers/{traveler_id}",
    params(
        ("traveler_id" = String, Path, description = "ID of the traveler to retrieve")
    ),
    responses(
        (status = 200, description = "Traveler retrieved", body = TravelerResponse),
        (status = 404, description = "Traveler not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_traveler(
    State(service): State<Arc<AppService>>,
    Path(traveler_id): Path<String>,
) -> Result<Json<TravelerResponse>, ApiError> {
    let traveler = service.get_traveler(&traveler_id).await?;
    Ok(Json(traveler.into()))
}

#[utoipa::path(
    post,
    path = "/api/trips",
    request_body = CreateTripRequest,
    responses(
        (status = 201, description = "Trip created", body = Trip),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 404, description = "Traveler not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn create_trip(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateTripRequest>,
) -> Result<(StatusCode, Json<Trip>), ApiError> {
    let trip = service.create_trip(&req.name, &req.member_ids, &claims.sub).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}",
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 200, description = "Trip retrieved", body = Trip),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_trip(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<Trip>, ApiError> {
    let trip = service.get_trip(&trip_id, &claims.sub).await?;
    Ok(Json(trip))
}

#[utoipa::path(
    delete,
    path = "/api/trips/{trip_id}",
    params(("trip_id" = String, Path, description = "ID of the trip to delete")),
    responses(
        (status = 204, description = "Trip and its expenses deleted"),
        (status = 403, description = "Not trip owner", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn delete_trip(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    service.delete_trip(&trip_id, &claims.sub).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/trips/{trip_id}/members",
    request_body = AddMemberRequest,
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 200, description = "Member added", body = Trip),
        (status = 400, description = "Bad request", body = ErrorResponse),
        (status = 403, description = "Not trip owner", body = ErrorResponse),
        (status = 404, description = "Traveler or trip not found", body = ErrorResponse),
        (status = 409, description = "Traveler already a member", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn add_member(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> Result<Json<Trip>, ApiError> {
    let trip = match (req.traveler_id, req.email) {
        (Some(traveler_id), None) => service.add_member(&trip_id, &traveler_id, &claims.sub).await?,
        (None, Some(email)) => service.add_member_by_email(&trip_id, &email, &claims.sub).await?,
        _ => {
            return Err(LedgerError::invalid_input(
                "traveler_id",
                "Invalid member",
                "Provide exactly one of traveler_id or email",
            )
            .into());
        }
    };
    Ok(Json(trip))
}

#[utoipa::path(
    delete,
    path = "/api/trips/{trip_id}/members/{traveler_id}",
    params(
        ("trip_id" = String, Path, description = "ID of the trip"),
        ("traveler_id" = String, Path, description = "ID of the member to remove")
    ),
    responses(
        (status = 200, description = "Member removed", body = Trip),
        (status = 400, description = "Member still takes part in expenses", body = ErrorResponse),
        (status = 403, description = "Not trip owner", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn remove_member(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path((trip_id, traveler_id)): Path<(String, String)>,
) -> Result<Json<Trip>, ApiError> {
    let trip = service.remove_member(&trip_id, &traveler_id, &claims.sub).await?;
    Ok(Json(trip))
}

#[utoipa::path(
    post,
    path = "/api/trips/{trip_id}/expenses/equal",
    request_body = CreateEqualExpenseRequest,
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 201, description = "Expense created", body = ExpenseResponse),
        (status = 400, description = "Invalid expense", body = ErrorResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn create_equal_split_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
    Json(req): Json<CreateEqualExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let expense = NewExpense {
        title: req.title,
        payer_id: req.payer_id,
        total_cost: cents_from_dto("total_cost", req.total_cost)?,
    };
    let created = service
        .create_equal_split_expense(&trip_id, expense, req.members, req.split_type, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    post,
    path = "/api/trips/{trip_id}/expenses",
    request_body = CreateExpenseRequest,
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 201, description = "Expense created", body = ExpenseResponse),
        (status = 400, description = "Invalid expense or split", body = ErrorResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn create_custom_split_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
    Json(req): Json<CreateExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), ApiError> {
    let expense = NewExpense {
        title: req.title,
        payer_id: req.payer_id,
        total_cost: cents_from_dto("total_cost", req.total_cost)?,
    };
    let splits = splits_from_dto(req.split_type, req.splits)?;
    let created = service
        .create_custom_split_expense(&trip_id, expense, splits, &claims.sub)
        .await?;
    Ok((StatusCode::CREATED, Json(created.into())))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/expenses",
    params(
        ("trip_id" = String, Path, description = "ID of the trip"),
        ListExpensesQuery
    ),
    responses(
        (status = 200, description = "Expenses of the trip", body = Vec<ExpenseSummary>),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn list_expenses(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
    Query(query): Query<ListExpensesQuery>,
) -> Result<Json<Vec<ExpenseSummary>>, ApiError> {
    let expenses = service.list_expenses(&trip_id, query.split_type, &claims.sub).await?;
    Ok(Json(expenses.into_iter().map(ExpenseSummary::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/balances",
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 200, description = "Net balance per member", body = BalancesResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_balances(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<BalancesResponse>, ApiError> {
    let sheet = service.get_balances(&trip_id, &claims.sub).await?;
    Ok(Json(BalancesResponse::new(trip_id, sheet)))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/settlements",
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 200, description = "Suggested transfers that settle the trip", body = SettlementPlanResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_settlement_plan(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<SettlementPlanResponse>, ApiError> {
    let transfers = service.get_settlement_plan(&trip_id, &claims.sub).await?;
    Ok(Json(SettlementPlanResponse {
        trip_id,
        transfers: transfers.into_iter().map(TransferResponse::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/trips/{trip_id}/audits",
    params(("trip_id" = String, Path, description = "ID of the trip")),
    responses(
        (status = 200, description = "Audit trail of the trip", body = Vec<TripAudit>),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Trip not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_trip_audits(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(trip_id): Path<String>,
) -> Result<Json<Vec<TripAudit>>, ApiError> {
    let audits = service.get_trip_audits(&trip_id, &claims.sub).await?;
    Ok(Json(audits))
}

#[utoipa::path(
    get,
    path = "/api/expenses/{expense_id}",
    params(("expense_id" = String, Path, description = "ID of the expense")),
    responses(
        (status = 200, description = "Expense details", body = ExpenseResponse),
        (status = 403, description = "Not a trip member", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_expense_details(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let expense = service.get_expense_details(&expense_id, &claims.sub).await?;
    Ok(Json(expense.into()))
}

#[utoipa::path(
    put,
    path = "/api/expenses/{expense_id}",
    request_body = ModifyExpenseRequest,
    params(("expense_id" = String, Path, description = "ID of the expense")),
    responses(
        (status = 200, description = "Expense replaced", body = ExpenseResponse),
        (status = 400, description = "Invalid expense or split", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 409, description = "Expense changed since it was read", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn modify_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
    Json(req): Json<ModifyExpenseRequest>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let update = ExpenseUpdate {
        title: req.title,
        payer_id: req.payer_id,
        total_cost: cents_from_dto("total_cost", req.total_cost)?,
        splits: splits_from_dto(req.split_type, req.splits)?,
        expected_version: req.expected_version,
    };
    let expense = service.modify_expense(&expense_id, update, &claims.sub).await?;
    Ok(Json(expense.into()))
}

#[utoipa::path(
    patch,
    path = "/api/expenses/{expense_id}/total_cost",
    request_body = ModifyTotalCostRequest,
    params(("expense_id" = String, Path, description = "ID of a percentage-split expense")),
    responses(
        (status = 200, description = "Total cost changed", body = ExpenseResponse),
        (status = 400, description = "Invalid amount or money-split expense", body = ErrorResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 409, description = "Expense changed since it was read", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn modify_expense_total_cost(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
    Json(req): Json<ModifyTotalCostRequest>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let total_cost = cents_from_dto("total_cost", req.total_cost)?;
    let expense = service
        .modify_expense_total_cost(&expense_id, total_cost, req.expected_version, &claims.sub)
        .await?;
    Ok(Json(expense.into()))
}

#[utoipa::path(
    post,
    path = "/api/expenses/{expense_id}/convert",
    request_body = ConvertExpenseRequest,
    params(("expense_id" = String, Path, description = "ID of the expense")),
    responses(
        (status = 200, description = "Expense converted", body = ExpenseResponse),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 409, description = "Expense changed since it was read", body = ErrorResponse),
        (status = 422, description = "Expense cannot be converted", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn convert_expense_type(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
    Json(req): Json<ConvertExpenseRequest>,
) -> Result<Json<ExpenseResponse>, ApiError> {
    let expense = service
        .convert_expense_type(&expense_id, req.target_type, req.expected_version, &claims.sub)
        .await?;
    Ok(Json(expense.into()))
}

#[utoipa::path(
    delete,
    path = "/api/expenses/{expense_id}",
    params(
        ("expense_id" = String, Path, description = "ID of the expense"),
        DeleteExpenseQuery
    ),
    responses(
        (status = 204, description = "Expense deleted"),
        (status = 404, description = "Expense not found", body = ErrorResponse),
        (status = 409, description = "Expense changed since it was read", body = ErrorResponse)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn delete_expense(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
    Path(expense_id): Path<String>,
    Query(query): Query<DeleteExpenseQuery>,
) -> Result<StatusCode, ApiError> {
    service
        .delete_expense(&expense_id, query.expected_version, &claims.sub)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/logs",
    responses(
        (status = 200, description = "Application log entries of the calling traveler", body = Vec<AppLog>)
    ),
    security(("Bearer" = []))
)]
pub(crate) async fn get_app_logs(
    State(service): State<Arc<AppService>>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<AppLog>>, ApiError> {
    let logs = service.get_app_logs(&claims.sub).await?;
    Ok(Json(logs))
}
