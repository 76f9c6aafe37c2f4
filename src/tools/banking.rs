//! HTTP tools backed by the banking REST backend.
//!
//! Every endpoint shares one contract: `POST {base_url}/{path}` with
//! `{"query": ...}`, answering `{"message": ...}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::traits::{Tool, ToolError};

/// Static description of one backend endpoint.
#[derive(Debug, Clone, Copy)]
pub struct BankingEndpoint {
    /// Intent (and tool) name routed to this endpoint.
    pub intent: &'static str,
    pub path: &'static str,
    pub description: &'static str,
    /// Reply used when the backend omits `message`.
    pub default_message: &'static str,
    pub failure_message: &'static str,
}

pub const BANKING_ENDPOINTS: &[BankingEndpoint] = &[
    BankingEndpoint {
        intent: "balance",
        path: "balance",
        description: "Check the current account balance of the user.",
        default_message: "Balance info not available.",
        failure_message: "Unable to fetch account balance right now.",
    },
    BankingEndpoint {
        intent: "transfer",
        path: "transfer",
        description: "Initiate a money transfer to another account.",
        default_message: "Transfer info not available.",
        failure_message: "Unable to initiate money transfer at the moment.",
    },
    BankingEndpoint {
        intent: "fraud_report",
        path: "report-fraud",
        description: "Report a fraudulent or suspicious transaction.",
        default_message: "Fraud report not processed.",
        failure_message: "Unable to report fraud right now.",
    },
    BankingEndpoint {
        intent: "open_account",
        path: "open-account",
        description: "Send a link to open a new bank account.",
        default_message: "Account opening link not sent.",
        failure_message: "Unable to send account opening link.",
    },
    BankingEndpoint {
        intent: "loan_application",
        path: "loan-status",
        description: "Retrieve the status of a loan application.",
        default_message: "Loan status not available.",
        failure_message: "Unable to retrieve loan status right now.",
    },
];

#[derive(Serialize)]
struct ToolRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct ToolResponse {
    message: Option<String>,
}

pub struct BankingApiTool {
    endpoint: BankingEndpoint,
    url: String,
    client: reqwest::Client,
}

impl BankingApiTool {
    pub fn new(endpoint: BankingEndpoint, base_url: &str, client: reqwest::Client) -> Self {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint.path);
        Self {
            endpoint,
            url,
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn http_error(&self, source: reqwest::Error) -> ToolError {
        ToolError::Http {
            endpoint: self.endpoint.path.to_string(),
            source,
        }
    }
}

#[async_trait]
impl Tool for BankingApiTool {
    fn name(&self) -> &str {
        self.endpoint.intent
    }

    fn description(&self) -> &str {
        self.endpoint.description
    }

    fn failure_message(&self) -> &str {
        self.endpoint.failure_message
    }

    async fn invoke(&self, input: &str) -> Result<String, ToolError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ToolRequest { query: input })
            .send()
            .await
            .map_err(|e| self.http_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Status {
                endpoint: self.endpoint.path.to_string(),
                status: status.as_u16(),
            });
        }

        let body: ToolResponse = response.json().await.map_err(|e| self.http_error(e))?;
        Ok(body
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.endpoint.default_message.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(intent: &str) -> BankingEndpoint {
        *BANKING_ENDPOINTS
            .iter()
            .find(|e| e.intent == intent)
            .unwrap()
    }

    #[test]
    fn url_joins_base_and_path() {
        let tool = BankingApiTool::new(
            endpoint("fraud_report"),
            "http://localhost:5001/",
            reqwest::Client::new(),
        );
        assert_eq!(tool.url(), "http://localhost:5001/report-fraud");
        assert_eq!(tool.name(), "fraud_report");
    }

    #[tokio::test]
    async fn returns_backend_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/transfer"))
            .and(body_json(json!({"query": "Transfer 200 from checking to savings"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"message": "Money transfer has been successfully initiated."}),
            ))
            .expect(1)
            .mount(&server)
            .await;

        let tool = BankingApiTool::new(endpoint("transfer"), &server.uri(), reqwest::Client::new());
        let reply = tool
            .invoke("Transfer 200 from checking to savings")
            .await
            .unwrap();
        assert_eq!(reply, "Money transfer has been successfully initiated.");
    }

    #[tokio::test]
    async fn missing_message_uses_default() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/balance"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let tool = BankingApiTool::new(endpoint("balance"), &server.uri(), reqwest::Client::new());
        assert_eq!(tool.invoke("balance").await.unwrap(), "Balance info not available.");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/loan-status"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let tool = BankingApiTool::new(
            endpoint("loan_application"),
            &server.uri(),
            reqwest::Client::new(),
        );
        match tool.invoke("loan").await {
            Err(ToolError::Status { status, endpoint }) => {
                assert_eq!(status, 500);
                assert_eq!(endpoint, "loan-status");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }
}
