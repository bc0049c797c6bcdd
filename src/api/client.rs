use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{
    header::AUTHORIZATION,
    multipart::{Form, Part},
    RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::{
    api::{
        dto::{ErrorBody, MemberBody, MemberListBody, MemberPageDto, TokenDto, UserBody, UserRosterDto},
        DirectoryApi, MemberDetails, MemberPage, UserDirectory, UserRoster,
    },
    auth::{TokenScope, TokenStore},
    config::ApiConfig,
    domain::*,
    error::{AppError, Result},
};

const ADMIN_AUTHORIZATION: &str = "AdminAuthorization";

/// `DirectoryApi` over HTTP. Tokens are read from the store on every call so
/// a login or logout elsewhere takes effect immediately.
pub struct HttpDirectoryApi {
    client: reqwest::Client,
    base_url: String,
    tokens: Arc<dyn TokenStore>,
}

impl HttpDirectoryApi {
    pub fn new(config: &ApiConfig, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            tokens,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the token for `scope`, refusing to build the request at all
    /// when there is none.
    async fn authorize(&self, builder: RequestBuilder, scope: TokenScope) -> Result<RequestBuilder> {
        let token = self
            .tokens
            .get(scope)
            .await?
            .ok_or(AppError::Unauthorized(scope))?;

        Ok(match scope {
            TokenScope::User => builder.header(AUTHORIZATION, token),
            TokenScope::Admin => builder.header(ADMIN_AUTHORIZATION, format!("Bearer {}", token)),
        })
    }

    async fn execute(&self, builder: RequestBuilder, scope: Option<TokenScope>) -> Result<Response> {
        let builder = match scope {
            Some(scope) => self.authorize(builder, scope).await?,
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = response
            .json::<ErrorBody>()
            .await
            .unwrap_or_default()
            .into_message()
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());

        Err(self.status_error(status, message, scope).await)
    }

    async fn status_error(&self, status: StatusCode, message: String, scope: Option<TokenScope>) -> AppError {
        match (status, scope) {
            (StatusCode::UNAUTHORIZED, Some(scope)) => {
                tracing::warn!("Backend rejected {} token, clearing it", scope);
                if let Err(e) = self.tokens.clear(scope).await {
                    tracing::error!("Failed to clear {} token: {}", scope, e);
                }
                AppError::Unauthorized(scope)
            }
            (StatusCode::UNAUTHORIZED, None) => AppError::BadRequest(message),
            (StatusCode::NOT_FOUND, _) => AppError::NotFound(message),
            (StatusCode::BAD_REQUEST, _) | (StatusCode::UNPROCESSABLE_ENTITY, _) => AppError::BadRequest(message),
            (StatusCode::CONFLICT, _) => AppError::Conflict(message),
            _ => AppError::UnexpectedResponse(format!("{}: {}", status, message)),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder, scope: Option<TokenScope>) -> Result<T> {
        let response = self.execute(builder, scope).await?;
        Ok(response.json::<T>().await?)
    }
}

fn photo_part(photo: &PhotoUpload) -> Result<Part> {
    Part::bytes(photo.bytes.clone())
        .file_name(photo.file_name.clone())
        .mime_str(&photo.content_type)
        .map_err(|e| AppError::single_field("dp", &format!("Unsupported image type: {}", e)))
}

fn format_dob(dob: &chrono::NaiveDate) -> String {
    dob.format("%Y-%m-%d").to_string()
}

fn create_form(request: &CreateMemberRequest) -> Result<Form> {
    let mut form = Form::new()
        .text("firstName", request.first_name.clone())
        .text("lastName", request.last_name.clone())
        .text("address", request.address.clone());

    if let Some(email) = &request.email {
        form = form.text("email", email.clone());
    }
    if let Some(phone) = &request.phone_number {
        form = form.text("phoneNumber", phone.clone());
    }
    if let Some(dob) = &request.dob {
        form = form.text("dob", format_dob(dob));
    }
    if let Some(photo) = &request.dp {
        form = form.part("dp", photo_part(photo)?);
    }

    Ok(form)
}

fn update_form(request: &UpdateMemberRequest) -> Result<Form> {
    let mut form = Form::new();
    let text_fields = [
        ("firstName", &request.first_name),
        ("lastName", &request.last_name),
        ("address", &request.address),
        ("email", &request.email),
        ("phoneNumber", &request.phone_number),
    ];
    for (name, value) in text_fields {
        if let Some(value) = value {
            form = form.text(name, value.clone());
        }
    }
    if let Some(dob) = &request.dob {
        form = form.text("dob", format_dob(dob));
    }
    if let Some(photo) = &request.dp {
        form = form.part("dp", photo_part(photo)?);
    }
    Ok(form)
}

fn auth_prefix(scope: TokenScope) -> &'static str {
    match scope {
        TokenScope::User => "/auth",
        TokenScope::Admin => "/admin",
    }
}

#[async_trait]
impl DirectoryApi for HttpDirectoryApi {
    async fn list_members(&self) -> Result<Vec<Member>> {
        let request = self.client.get(self.url("/members"));
        let body: MemberListBody = self.fetch(request, Some(TokenScope::User)).await?;
        body.into_members()
    }

    async fn search_members(&self, query: &str) -> Result<Vec<Member>> {
        let request = self
            .client
            .get(self.url("/members/search"))
            .query(&[("q", query)]);
        let body: MemberListBody = self.fetch(request, Some(TokenScope::User)).await?;
        body.into_members()
    }

    async fn get_member(&self, id: &MemberId) -> Result<MemberDetails> {
        let path = format!("/members/{}", urlencoding::encode(id.as_str()));
        let body: MemberBody = self.fetch(self.client.get(self.url(&path)), Some(TokenScope::User)).await?;
        body.into_dto().into_details()
    }

    async fn create_member(&self, request: &CreateMemberRequest) -> Result<Member> {
        let form = create_form(request)?;
        let builder = self.client.post(self.url("/members")).multipart(form);
        let body: MemberBody = self.fetch(builder, Some(TokenScope::User)).await?;
        body.into_dto().into_member(None)
    }

    async fn update_member(&self, id: &MemberId, request: &UpdateMemberRequest) -> Result<Member> {
        let form = update_form(request)?;
        let path = format!("/members/{}", urlencoding::encode(id.as_str()));
        let builder = self.client.put(self.url(&path)).multipart(form);
        let body: MemberBody = self.fetch(builder, Some(TokenScope::User)).await?;
        body.into_dto().into_member(None)
    }

    async fn current_user(&self) -> Result<UserDirectory> {
        let body: UserBody = self
            .fetch(self.client.get(self.url("/user/users")), Some(TokenScope::User))
            .await?;
        body.into_directory()
    }

    async fn update_user(&self, request: &UpdateUserRequest) -> Result<UserDirectory> {
        let builder = self.client.put(self.url("/user/users"));

        let builder = match &request.banner {
            Some(banner) => {
                let mut form = Form::new();
                if let Some(about_us) = &request.about_us {
                    form = form.text("aboutUs", about_us.clone());
                }
                if let Some(category) = &request.category {
                    form = form.text("category", category.as_str());
                }
                let part = photo_part(banner)
                    .map_err(|_| AppError::single_field("bannerImage", "Unsupported image type"))?;
                builder.multipart(form.part("bannerImage", part))
            }
            None => {
                let mut body = Map::new();
                if let Some(about_us) = &request.about_us {
                    body.insert("aboutUs".to_string(), json!(about_us));
                }
                if let Some(category) = &request.category {
                    body.insert("category".to_string(), json!(category.as_str()));
                }
                builder.json(&Value::Object(body))
            }
        };

        let body: UserBody = self.fetch(builder, Some(TokenScope::User)).await?;
        body.into_directory()
    }

    async fn request_approval(&self) -> Result<()> {
        let builder = self.client.post(self.url("/user/admin-approval-request"));
        self.execute(builder, Some(TokenScope::User)).await?;
        Ok(())
    }

    async fn login(&self, scope: TokenScope, credentials: &Credentials) -> Result<String> {
        let path = format!("{}/login", auth_prefix(scope));
        let body: TokenDto = self
            .fetch(self.client.post(self.url(&path)).json(credentials), None)
            .await?;
        Ok(body.token)
    }

    async fn register(&self, scope: TokenScope, request: &RegisterRequest) -> Result<String> {
        let path = format!("{}/register", auth_prefix(scope));
        let body: TokenDto = self
            .fetch(self.client.post(self.url(&path)).json(request), None)
            .await?;
        Ok(body.token)
    }

    async fn all_users(&self) -> Result<UserRoster> {
        let body: UserRosterDto = self
            .fetch(self.client.get(self.url("/admin/get-all-users")), Some(TokenScope::Admin))
            .await?;
        body.into_roster()
    }

    async fn user_members(&self, user_id: &UserId) -> Result<MemberPage> {
        let path = format!("/admin/get-user-members/{}", urlencoding::encode(user_id.as_str()));
        let body: MemberPageDto = self
            .fetch(self.client.get(self.url(&path)), Some(TokenScope::Admin))
            .await?;
        body.into_page(user_id)
    }

    async fn toggle_approval(&self, id: &MemberId) -> Result<Member> {
        let path = format!("/admin/approve-member/{}", urlencoding::encode(id.as_str()));
        let body: MemberBody = self
            .fetch(self.client.put(self.url(&path)), Some(TokenScope::Admin))
            .await?;
        body.into_dto().into_member(None)
    }
}
