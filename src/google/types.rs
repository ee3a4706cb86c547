use serde::{Deserialize, Serialize};

// https://developers.google.com/gmail/api/reference/rest/v1/users.messages/send
#[derive(Debug, Serialize)]
pub(super) struct SendMessageRequest<'a> {
    pub(super) raw: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct SentMessage {
    pub(super) id: String,
    #[serde(default)]
    pub(super) thread_id: Option<String>,
}
