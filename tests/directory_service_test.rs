mod common;

use std::sync::Arc;

use chrono::NaiveDate;
use common::{context, context_with_tokens, member, user, Call, FakeApi};
use kindred::{
    api::UserDirectory,
    auth::{MemoryTokenStore, TokenScope, TokenStore},
    domain::*,
    error::AppError,
    store::ListKey,
};

fn profile(members: Vec<Member>) -> UserDirectory {
    UserDirectory {
        user: user("u1", "family@example.com"),
        members,
    }
}

fn photo() -> PhotoUpload {
    PhotoUpload::from_file_name("jane.png", vec![0x89, 0x50, 0x4e, 0x47])
}

#[tokio::test]
async fn test_invalid_member_never_reaches_backend() -> anyhow::Result<()> {
    let api = FakeApi::new();
    let ctx = context(api.clone());

    let request = CreateMemberRequest {
        first_name: "  ".to_string(),
        last_name: "Doe".to_string(),
        address: "12 Lake Road".to_string(),
        email: Some("not-an-email".to_string()),
        phone_number: None,
        dob: NaiveDate::from_ymd_opt(1990, 4, 2),
        dp: None,
    };

    let err = ctx.directory_service.create_member(request).await.unwrap_err();
    let fields = err.field_errors().expect("validation error");
    assert!(fields.contains_key("first_name"));
    assert!(fields.contains_key("email"));
    assert!(fields.contains_key("dp"));
    assert!(api.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_created_member_joins_my_members() -> anyhow::Result<()> {
    let api = FakeApi::new();
    api.with_profile(profile(vec![member("m1", "u1", "Ravi", "Kumar", true, 1)]));
    let ctx = context(api.clone());
    ctx.directory_service.load_profile().await?;

    let request = CreateMemberRequest {
        first_name: " Jane ".to_string(),
        last_name: "Doe".to_string(),
        address: "12 Lake Road".to_string(),
        email: Some(String::new()),
        phone_number: None,
        dob: NaiveDate::from_ymd_opt(1990, 4, 2),
        dp: Some(photo()),
    };
    let created = ctx.directory_service.create_member(request).await?;

    assert_eq!(created.first_name, "Jane");
    assert_eq!(created.user_id, Some(UserId::new("u1")));
    let store = ctx.store.read().await;
    assert_eq!(store.members(&ListKey::MyMembers).len(), 2);
    assert!(store.has_pending(&ListKey::MyMembers));
    assert_eq!(api.calls(), vec![Call::CurrentUser, Call::Create]);
    Ok(())
}

#[tokio::test]
async fn test_unchanged_edit_sends_nothing() -> anyhow::Result<()> {
    let api = FakeApi::new();
    api.with_profile(profile(vec![member("m1", "u1", "Ravi", "Kumar", true, 1)]));
    let ctx = context(api.clone());
    ctx.directory_service.load_profile().await?;

    let id = MemberId::new("m1");
    let result = ctx
        .directory_service
        .edit_member(&id, None, |m| m.first_name = " Ravi ".to_string())
        .await?;
    assert!(result.is_none());
    assert_eq!(api.calls(), vec![Call::CurrentUser]);

    let updated = ctx
        .directory_service
        .edit_member(&id, None, |m| m.first_name = "Ravindra".to_string())
        .await?
        .expect("changed");
    assert_eq!(updated.first_name, "Ravindra");
    assert_eq!(api.calls(), vec![Call::CurrentUser, Call::Update(id.clone())]);
    assert_eq!(ctx.store.read().await.member(&id).unwrap().first_name, "Ravindra");
    Ok(())
}

#[tokio::test]
async fn test_request_approval_needs_pending_member() -> anyhow::Result<()> {
    let api = FakeApi::new();
    api.with_profile(profile(vec![member("m1", "u1", "Ravi", "Kumar", true, 1)]));
    let ctx = context(api.clone());
    ctx.directory_service.load_profile().await?;

    let err = ctx.directory_service.request_approval().await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(api.calls(), vec![Call::CurrentUser]);

    api.with_profile(profile(vec![
        member("m1", "u1", "Ravi", "Kumar", true, 1),
        member("m2", "u1", "Asha", "Kumar", false, 2),
    ]));
    ctx.directory_service.load_profile().await?;
    ctx.directory_service.request_approval().await?;
    assert_eq!(
        api.calls(),
        vec![Call::CurrentUser, Call::CurrentUser, Call::RequestApproval]
    );
    Ok(())
}

#[tokio::test]
async fn test_profile_changes_only_after_confirmation() -> anyhow::Result<()> {
    let api = FakeApi::new();
    api.with_profile(profile(vec![member("m1", "u1", "Ravi", "Kumar", true, 1)]));
    let release = api.gate("update_user");
    let ctx = Arc::new(context(api.clone()));
    ctx.directory_service.load_profile().await?;

    let pending = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            ctx.directory_service
                .update_profile(UpdateUserRequest {
                    about_us: Some("Three generations in Kolar".to_string()),
                    ..Default::default()
                })
                .await
        })
    };
    api.wait_for_calls(2).await;
    assert_eq!(ctx.store.read().await.profile().unwrap().about_us, "");

    release.send(()).unwrap();
    let user = pending.await??;
    assert_eq!(user.about_us, "Three generations in Kolar");

    let store = ctx.store.read().await;
    assert_eq!(store.profile().unwrap().about_us, "Three generations in Kolar");
    // Members survive a profile response that omits them.
    assert_eq!(store.members(&ListKey::MyMembers).len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_open_member_focuses_details() -> anyhow::Result<()> {
    let api = FakeApi::new();
    api.with_members(vec![member("m1", "u1", "Ravi", "Kumar", true, 1)]);
    let ctx = context(api.clone());

    ctx.directory_service.open_member(&MemberId::new("m1")).await?;
    assert_eq!(ctx.store.read().await.focused().unwrap().first_name, "Ravi");

    let err = ctx.directory_service.open_member(&MemberId::new("missing")).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    let store = ctx.store.read().await;
    assert!(matches!(store.error(&ListKey::Siblings), Some(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn test_login_stores_token_per_scope() -> anyhow::Result<()> {
    let api = FakeApi::new();
    let tokens = Arc::new(MemoryTokenStore::new());
    let ctx = context_with_tokens(api.clone(), tokens.clone());

    let credentials = Credentials {
        email: "admin@example.com".to_string(),
        password: "secret".to_string(),
    };
    ctx.auth_service.login(TokenScope::Admin, &credentials).await?;
    assert_eq!(tokens.get(TokenScope::Admin).await?.as_deref(), Some("admin-token"));
    assert_eq!(tokens.get(TokenScope::User).await?, None);

    let bad = Credentials {
        email: "admin@example.com".to_string(),
        password: "wrong".to_string(),
    };
    assert!(ctx.auth_service.login(TokenScope::User, &bad).await.is_err());
    assert!(!ctx.auth_service.is_signed_in(TokenScope::User).await?);

    let malformed = Credentials {
        email: "nope".to_string(),
        password: "secret".to_string(),
    };
    let err = ctx.auth_service.login(TokenScope::User, &malformed).await.unwrap_err();
    assert!(err.field_errors().is_some());
    assert_eq!(api.calls(), vec![Call::Login(TokenScope::Admin), Call::Login(TokenScope::User)]);

    ctx.auth_service.logout(TokenScope::Admin).await?;
    assert!(!ctx.auth_service.is_signed_in(TokenScope::Admin).await?);
    Ok(())
}
