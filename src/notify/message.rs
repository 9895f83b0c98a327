use clap::Args;
use serde::Serialize;
use tinytemplate::TinyTemplate;

/// The six values a finished job script passes back to `submit notify`
///
/// Order matters: this is the argument list written into the decorated script.
#[derive(Args, Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Completion {
    /// Email address to notify
    pub recipient: String,
    /// Scheduler job id
    pub job_id: String,
    /// Exit code of the job script body
    pub return_code: String,
    /// Run time of the job script body in seconds
    pub elapsed: String,
    /// Directory the job started in
    pub directory: String,
    /// Script and arguments as originally submitted
    pub command_line: String,
}

impl Completion {
    pub fn succeeded(&self) -> bool {
        self.return_code == "0"
    }
}

/// A rendered email, ready for a mail transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationMessage {
    pub recipient: String,
    pub subject: String,
    /// HTML body
    pub body: String,
}

impl NotificationMessage {
    pub fn build(completion: &Completion) -> Result<NotificationMessage, tinytemplate::error::Error> {
        /// included email body template, values are HTML escaped
        static NOTIFICATION: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/data/templates/notification.html"));
        let mut tt = TinyTemplate::new();
        tt.add_template("notification", NOTIFICATION)?;

        let outcome = match completion.succeeded() {
            true => "success",
            false => "failed"
        };
        Ok(NotificationMessage {
            recipient: completion.recipient.clone(),
            subject: format!("Job {}: {}", completion.job_id, outcome),
            body: tt.render("notification", completion)?,
        })
    }
}
