//! services/api/src/web/rest.rs
//!
//! Assembles the REST router and holds the master definition for the OpenAPI
//! specification.

use crate::web::{
    assessment::{self, assessment_form_handler, submit_assessment_handler},
    auth::{self, login_handler, logout_handler, signup_handler},
    chat::{
        self, chat_handler, conversation_handler, history_handler, new_conversation_handler,
        send_message_handler,
    },
    mood::{self, create_mood_entry_handler, mood_chart_data_handler, mood_tracker_handler},
    preferences::{self, get_preferences_handler, update_preferences_handler},
    protocol,
    resources::{self, crisis_help_handler, resources_handler},
    session::track_session,
    state::AppState,
};
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::OpenApi;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        chat::chat_handler,
        chat::send_message_handler,
        chat::new_conversation_handler,
        chat::history_handler,
        chat::conversation_handler,
        mood::mood_tracker_handler,
        mood::create_mood_entry_handler,
        mood::mood_chart_data_handler,
        assessment::assessment_form_handler,
        assessment::submit_assessment_handler,
        resources::resources_handler,
        resources::crisis_help_handler,
        preferences::get_preferences_handler,
        preferences::update_preferences_handler,
        auth::signup_handler,
        auth::login_handler,
        auth::logout_handler,
    ),
    components(
        schemas(
            protocol::ChatView,
            protocol::ConversationView,
            protocol::MessageView,
            protocol::SendMessageRequest,
            protocol::SendMessageResponse,
            protocol::HistoryPage,
            protocol::ConversationDetail,
            protocol::MoodEntryView,
            protocol::MoodTrackerView,
            protocol::NewMoodEntryRequest,
            protocol::ChartPoint,
            protocol::ChartData,
            protocol::Choice,
            protocol::QuestionView,
            protocol::AssessmentForm,
            protocol::AssessmentRequest,
            protocol::AssessmentResult,
            protocol::ResourceView,
            protocol::ResourcesView,
            protocol::CrisisHelpView,
            protocol::PreferencesView,
            protocol::UpdatePreferencesRequest,
            auth::SignupRequest,
            auth::LoginRequest,
            auth::AuthResponse,
        )
    ),
    tags(
        (name = "Moodigo API", description = "Chat support, mood tracking and self-assessment for students.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Router
//=========================================================================================

/// Builds every API route. Routes that read or write visitor data sit behind
/// the session middleware.
pub fn router(state: Arc<AppState>) -> Router {
    // Public routes (no visitor session needed)
    let public_routes = Router::new()
        .route("/assessment", get(assessment_form_handler))
        .route("/resources", get(resources_handler))
        .route("/crisis-help", get(crisis_help_handler))
        .route("/auth/logout", post(logout_handler));

    // Visitor routes
    let visitor_routes = Router::new()
        .route("/chat", get(chat_handler))
        .route("/send-message", post(send_message_handler))
        .route("/new-conversation", post(new_conversation_handler))
        .route("/history", get(history_handler))
        .route("/conversation/{id}", get(conversation_handler))
        .route(
            "/mood-tracker",
            get(mood_tracker_handler).post(create_mood_entry_handler),
        )
        .route("/mood-chart-data", get(mood_chart_data_handler))
        .route("/assessment", post(submit_assessment_handler))
        .route(
            "/preferences",
            get(get_preferences_handler).put(update_preferences_handler),
        )
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            track_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(visitor_routes)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::DbAdapter;
    use crate::config::Config;
    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
    };
    use moodigo_core::domain::{Condition, NewResource, ResourceType, RiskLevel};
    use moodigo_core::ports::{
        DatabaseService, PortResult, RiskModel, RiskPrediction, TextClassifier, TextPrediction,
    };
    use moodigo_core::Analyzer;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;
    use tower::ServiceExt;

    struct KeywordClassifier;

    impl TextClassifier for KeywordClassifier {
        fn classify(&self, processed_text: &str) -> PortResult<TextPrediction> {
            let (condition, confidence) = if processed_text.contains("end it all") {
                (Condition::Suicidal, 0.9)
            } else {
                (Condition::Normal, 0.75)
            };
            Ok(TextPrediction {
                condition,
                probabilities: BTreeMap::from([(condition, confidence)]),
                confidence,
            })
        }
    }

    struct FixedRisk;

    impl RiskModel for FixedRisk {
        fn predict(&self, _answers: &[u8]) -> PortResult<RiskPrediction> {
            Ok(RiskPrediction {
                risk_level: RiskLevel::High,
                confidence: 0.6,
            })
        }
    }

    struct TestApp {
        router: Router,
        db: DbAdapter,
    }

    struct Reply {
        status: StatusCode,
        cookie: Option<String>,
        body: Value,
    }

    async fn test_app() -> TestApp {
        let db = DbAdapter::in_memory().await.unwrap();
        let config = Config::from_lookup(|_| None).unwrap();
        let state = Arc::new(AppState {
            db: Arc::new(db.clone()),
            config: Arc::new(config),
            analyzer: Arc::new(Analyzer::new(Arc::new(KeywordClassifier), Arc::new(FixedRisk))),
        });
        TestApp {
            router: router(state),
            db,
        }
    }

    impl TestApp {
        async fn call(
            &self,
            method: Method,
            uri: &str,
            cookie: Option<&str>,
            body: Option<&str>,
        ) -> Reply {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(cookie) = cookie {
                builder = builder.header(header::COOKIE, cookie);
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string())),
                None => builder.body(Body::empty()),
            }
            .unwrap();

            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let cookie = response
                .headers()
                .get(header::SET_COOKIE)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(';').next())
                .map(str::to_string);
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            Reply {
                status,
                cookie,
                body,
            }
        }

        async fn get(&self, uri: &str, cookie: &str) -> Reply {
            self.call(Method::GET, uri, Some(cookie), None).await
        }

        async fn post(&self, uri: &str, cookie: &str, body: Value) -> Reply {
            self.call(Method::POST, uri, Some(cookie), Some(&body.to_string()))
                .await
        }

        /// A fresh visitor's cookie.
        async fn visitor(&self) -> String {
            self.call(Method::GET, "/chat", None, None)
                .await
                .cookie
                .expect("new visitors get a session cookie")
        }
    }

    #[tokio::test]
    async fn new_visitors_get_a_cookie_and_keep_their_conversation() {
        let app = test_app().await;
        let first = app.call(Method::GET, "/chat", None, None).await;
        assert_eq!(first.status, StatusCode::OK);
        let cookie = first.cookie.unwrap();
        assert!(cookie.starts_with("moodigo_session="));

        let second = app.get("/chat", &cookie).await;
        assert!(second.cookie.is_none());
        assert_eq!(
            first.body["conversation"]["id"],
            second.body["conversation"]["id"]
        );
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let app = test_app().await;
        let cookie = app.visitor().await;
        let reply = app
            .post("/send-message", &cookie, json!({ "message": "   " }))
            .await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(reply.body, json!({ "error": "Message cannot be empty" }));
    }

    #[tokio::test]
    async fn malformed_message_body_is_a_server_error_with_json() {
        let app = test_app().await;
        let cookie = app.visitor().await;
        let reply = app
            .call(Method::POST, "/send-message", Some(&cookie), Some("{not json"))
            .await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(reply.body["error"].is_string());
    }

    #[tokio::test]
    async fn crisis_message_flags_the_visitor() {
        let app = test_app().await;
        let cookie = app.visitor().await;

        let reply = app
            .post("/send-message", &cookie, json!({ "message": "I want to end it all" }))
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["prediction"], "Suicidal");
        assert_eq!(reply.body["is_crisis"], true);
        assert!(reply.body["bot_response"].as_str().unwrap().contains("988"));
        assert_eq!(reply.body["timestamp"].as_str().unwrap().len(), 5);

        let preferences = app.get("/preferences", &cookie).await;
        assert_eq!(preferences.body["crisis_mode"], true);

        let chat = app.get("/chat", &cookie).await;
        let messages = chat.body["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["sender"], "user");
        assert_eq!(messages[1]["predicted_condition"], "Suicidal");
    }

    #[tokio::test]
    async fn ordinary_message_does_not_touch_crisis_mode() {
        let app = test_app().await;
        let cookie = app.visitor().await;
        let reply = app
            .post("/send-message", &cookie, json!({ "message": "Exams went fine" }))
            .await;
        assert_eq!(reply.body["prediction"], "Normal");
        assert_eq!(reply.body["is_crisis"], false);

        let preferences = app.get("/preferences", &cookie).await;
        assert_eq!(preferences.body["crisis_mode"], false);
    }

    #[tokio::test]
    async fn new_conversation_shows_up_in_history() {
        let app = test_app().await;
        let cookie = app.visitor().await;
        let first = app.get("/chat", &cookie).await.body["conversation"]["id"].clone();

        let reply = app.post("/new-conversation", &cookie, json!({})).await;
        assert_eq!(reply.status, StatusCode::NO_CONTENT);
        let second = app.get("/chat", &cookie).await.body["conversation"]["id"].clone();
        assert_ne!(first, second);

        let history = app.get("/history?page=7", &cookie).await;
        assert_eq!(history.body["total"], 2);
        assert_eq!(history.body["page"], 1);
        assert_eq!(history.body["conversations"][0]["id"], second);
    }

    #[tokio::test]
    async fn conversations_of_other_visitors_are_hidden() {
        let app = test_app().await;
        let owner = app.visitor().await;
        let stranger = app.visitor().await;
        let id = app.get("/chat", &owner).await.body["conversation"]["id"].clone();

        let uri = format!("/conversation/{}", id);
        assert_eq!(app.get(&uri, &owner).await.status, StatusCode::OK);
        let hidden = app.get(&uri, &stranger).await;
        assert_eq!(hidden.status, StatusCode::NOT_FOUND);
        assert!(hidden.body["error"].is_string());
    }

    #[tokio::test]
    async fn mood_entries_are_validated_and_charted() {
        let app = test_app().await;
        let cookie = app.visitor().await;

        let bad = app
            .post("/mood-tracker", &cookie, json!({ "mood": "sad", "intensity": 11 }))
            .await;
        assert_eq!(bad.status, StatusCode::BAD_REQUEST);
        let unknown = app
            .post("/mood-tracker", &cookie, json!({ "mood": "elated", "intensity": 5 }))
            .await;
        assert_eq!(unknown.status, StatusCode::BAD_REQUEST);

        let created = app
            .post(
                "/mood-tracker",
                &cookie,
                json!({ "mood": "stressed", "intensity": 7, "notes": "deadline" }),
            )
            .await;
        assert_eq!(created.status, StatusCode::CREATED);

        let tracker = app.get("/mood-tracker", &cookie).await;
        assert_eq!(tracker.body["entries"].as_array().unwrap().len(), 1);
        assert!(tracker.body["insights"]
            .as_str()
            .unwrap()
            .contains("mindfulness"));

        let chart = app.get("/mood-chart-data", &cookie).await;
        assert_eq!(chart.body["chart_data"][0]["mood"], "stressed");
        assert_eq!(chart.body["chart_data"][0]["intensity"], 7);
    }

    #[tokio::test]
    async fn body_errors_are_json_bad_requests() {
        let app = test_app().await;
        let cookie = app.visitor().await;

        for (method, uri, body) in [
            (Method::POST, "/mood-tracker", "{\"mood\": \"sad\""),
            (Method::POST, "/mood-tracker", "{\"mood\": \"sad\"}"),
            (Method::POST, "/mood-tracker", "{\"mood\": \"sad\", \"intensity\": \"lots\"}"),
            (Method::POST, "/assessment", "{\"responses\": [1, 2]}"),
            (Method::PUT, "/preferences", "{\"daily_check_ins\": \"sometimes\"}"),
            (Method::POST, "/auth/signup", "{\"email\": \"a@b.c\"}"),
            (Method::POST, "/auth/login", "not json"),
        ] {
            let reply = app.call(method, uri, Some(&cookie), Some(body)).await;
            assert_eq!(reply.status, StatusCode::BAD_REQUEST, "{} {}", uri, body);
            assert!(reply.body["error"].is_string(), "{} {}", uri, body);
        }

        let bare = app.call(Method::POST, "/mood-tracker", Some(&cookie), None).await;
        assert_eq!(bare.status, StatusCode::BAD_REQUEST);
        assert!(bare.body["error"].is_string());
    }

    #[tokio::test]
    async fn numeric_strings_are_accepted() {
        let app = test_app().await;
        let cookie = app.visitor().await;

        let entry = app
            .post("/mood-tracker", &cookie, json!({ "mood": "sad", "intensity": "5" }))
            .await;
        assert_eq!(entry.status, StatusCode::CREATED);
        assert_eq!(entry.body["intensity"], 5);

        let assessment = app
            .post(
                "/assessment",
                &cookie,
                json!({ "responses": { "question_0": "3", "question_1": 2 } }),
            )
            .await;
        assert_eq!(assessment.status, StatusCode::CREATED);
        assert_eq!(assessment.body["total_score"], 5);
    }

    #[tokio::test]
    async fn assessment_is_scored_and_stored() {
        let app = test_app().await;
        let form = app.call(Method::GET, "/assessment", None, None).await;
        assert_eq!(form.body["questions"].as_array().unwrap().len(), 10);

        let cookie = app.visitor().await;
        let reply = app
            .post(
                "/assessment",
                &cookie,
                json!({ "responses": { "question_0": 4, "question_1": 3 } }),
            )
            .await;
        assert_eq!(reply.status, StatusCode::CREATED);
        assert_eq!(reply.body["risk_level"], "high");
        assert_eq!(reply.body["risk_label"], "High Risk");
        assert_eq!(reply.body["total_score"], 7);
        assert_eq!(reply.body["recommendations"].as_array().unwrap().len(), 3);

        let rejected = app
            .post("/assessment", &cookie, json!({ "responses": { "question_0": 9 } }))
            .await;
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn resources_are_grouped() {
        let app = test_app().await;
        let seed = [
            NewResource {
                title: "Lifeline",
                description: "24/7",
                resource_type: ResourceType::Crisis,
                url: "",
                phone_number: "988",
                is_crisis: true,
            },
            NewResource {
                title: "Headspace",
                description: "Meditation",
                resource_type: ResourceType::App,
                url: "https://www.headspace.com",
                phone_number: "",
                is_crisis: false,
            },
        ];
        app.db.seed_resources(&seed, false).await.unwrap();

        let reply = app.call(Method::GET, "/resources", None, None).await;
        assert_eq!(reply.body["crisis_resources"][0]["title"], "Lifeline");
        assert_eq!(reply.body["app_resources"][0]["title"], "Headspace");
        assert!(reply.body["article_resources"].as_array().unwrap().is_empty());

        let crisis = app.call(Method::GET, "/crisis-help", None, None).await;
        assert_eq!(crisis.body["crisis_resources"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn preferences_update_partially() {
        let app = test_app().await;
        let cookie = app.visitor().await;
        let reply = app
            .call(
                Method::PUT,
                "/preferences",
                Some(&cookie),
                Some(&json!({ "preferred_name": "Sam", "daily_check_ins": true }).to_string()),
            )
            .await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.body["preferred_name"], "Sam");
        assert_eq!(reply.body["daily_check_ins"], true);
        assert_eq!(reply.body["enable_mood_tracking"], true);

        let too_long = app
            .call(
                Method::PUT,
                "/preferences",
                Some(&cookie),
                Some(&json!({ "year_of_study": "x".repeat(21) }).to_string()),
            )
            .await;
        assert_eq!(too_long.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_login_and_logout() {
        let app = test_app().await;
        let cookie = app.visitor().await;
        let credentials = json!({ "email": "Student@Uni.edu", "password": "correct horse" });

        let signup = app.post("/auth/signup", &cookie, credentials.clone()).await;
        assert_eq!(signup.status, StatusCode::CREATED);
        assert_eq!(signup.body["email"], "student@uni.edu");

        let again = app.post("/auth/signup", &cookie, credentials.clone()).await;
        assert_eq!(again.status, StatusCode::BAD_REQUEST);

        let other = app.visitor().await;
        let wrong = app
            .post(
                "/auth/login",
                &other,
                json!({ "email": "student@uni.edu", "password": "wrong password" }),
            )
            .await;
        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        let login = app.post("/auth/login", &other, credentials).await;
        assert_eq!(login.status, StatusCode::OK);
        assert_eq!(login.body["user_id"], signup.body["user_id"]);

        let logout = app.post("/auth/logout", &other, json!({})).await;
        assert_eq!(logout.status, StatusCode::OK);
        assert_eq!(logout.cookie.as_deref(), Some("moodigo_session="));
    }
}
