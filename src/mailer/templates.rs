//! Message templates.

use crate::mailer::Email;

/// Sent after registration, carrying the activation token.
#[derive(Debug, Clone)]
pub struct WelcomeEmail<'a> {
    pub user_id: i64,
    pub activation_token: &'a str,
}

impl WelcomeEmail<'_> {
    pub fn render(&self, to: &str) -> Email {
        let subject = "Welcome to Greenlight!".to_string();

        let plain_body = format!(
            "Hi,\n\n\
             Thanks for signing up for a Greenlight account. We're excited to have you on board!\n\n\
             For future reference, your user ID number is {id}.\n\n\
             Please send a request to the `PUT /v1/users/activated` endpoint with the following JSON\n\
             body to activate your account:\n\n\
             {{\"token\": \"{token}\"}}\n\n\
             Please note that this is a one-time use token and it will expire in 3 days.\n\n\
             Thanks,\n\n\
             The Greenlight Team\n",
            id = self.user_id,
            token = self.activation_token,
        );

        let html_body = format!(
            "<!doctype html>\n<html>\n<head>\n\
             <meta name=\"viewport\" content=\"width=device-width\" />\n\
             <meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\" />\n\
             </head>\n<body>\n\
             <p>Hi,</p>\n\
             <p>Thanks for signing up for a Greenlight account. We're excited to have you on board!</p>\n\
             <p>For future reference, your user ID number is {id}.</p>\n\
             <p>Please send a request to the <code>PUT /v1/users/activated</code> endpoint with the \
             following JSON body to activate your account:</p>\n\
             <pre><code>{{\"token\": \"{token}\"}}</code></pre>\n\
             <p>Please note that this is a one-time use token and it will expire in 3 days.</p>\n\
             <p>Thanks,</p>\n<p>The Greenlight Team</p>\n\
             </body>\n</html>\n",
            id = self.user_id,
            token = self.activation_token,
        );

        Email {
            to: to.to_string(),
            subject,
            plain_body,
            html_body,
        }
    }
}
