// src/api/page.rs — HTML rendering of a transcript

use minijinja::{context, Environment};

use crate::chat::{Transcript, Turn};
use crate::infra::errors::BanterError;

const CHAT_TEMPLATE: &str = include_str!("../../templates/chat.html");

/// Renders the chat page. Output is auto-escaped, so turn text is shown
/// exactly as typed or generated and never interpreted as markup.
pub struct PageRenderer {
    env: Environment<'static>,
    title: String,
    model: String,
}

impl PageRenderer {
    pub fn new(title: impl Into<String>, model: impl Into<String>) -> Result<Self, BanterError> {
        let mut env = Environment::new();
        env.add_template("chat.html", CHAT_TEMPLATE)?;
        Ok(Self {
            env,
            title: title.into(),
            model: model.into(),
        })
    }

    pub fn render(&self, transcript: Option<&Transcript>) -> Result<String, BanterError> {
        let turns: Vec<&Turn> = transcript.map(|t| t.all().collect()).unwrap_or_default();
        self.render_page(turns, false)
    }

    /// Page shown while the session is busy with a round. It reloads itself.
    pub fn render_pending(&self) -> Result<String, BanterError> {
        self.render_page(Vec::new(), true)
    }

    fn render_page(&self, turns: Vec<&Turn>, pending: bool) -> Result<String, BanterError> {
        let tmpl = self.env.get_template("chat.html")?;
        let html = tmpl.render(context! {
            title => self.title,
            model => self.model,
            turns => turns,
            pending => pending,
        })?;
        Ok(html)
    }
}
