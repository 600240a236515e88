use crate::models::message::Message;
use ammonia::Builder;
use maplit::{hashmap, hashset};
use pulldown_cmark::{html, Options, Parser};

/// 把一条私信渲染成推送给客户端的展示片段
#[cfg_attr(test, mockall::automock)]
pub trait Renderer: Send + Sync {
    fn render_message(&self, message: &Message, sender_name: &str) -> String;
}

#[derive(Clone)]
pub struct MarkdownRenderer {}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {}
    }

    fn get_sanitizer() -> Builder<'static> {
        let mut sanitizer = Builder::default();

        // 私信只允许少量行内排版
        sanitizer.tags(hashset![
            "p", "br",
            "strong", "em", "s", "code",
            "pre", "blockquote",
            "ul", "ol", "li",
            "a",
        ]);
        sanitizer.tag_attributes(hashmap! {
            "a" => hashset!["href", "title"],
        });
        sanitizer.link_rel(Some("noopener noreferrer nofollow"));
        sanitizer
    }

    /// 将 Markdown 转换为经过清理的 HTML
    pub fn to_html(&self, markdown: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);

        let parser = Parser::new_ext(markdown, options);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        Self::get_sanitizer().clean(&html_output).to_string()
    }
}

impl Renderer for MarkdownRenderer {
    fn render_message(&self, message: &Message, sender_name: &str) -> String {
        format!(
            "<div class=\"message\" data-message-id=\"{}\"><strong class=\"sender\">{}</strong><div class=\"body\">{}</div><time>{}</time></div>",
            ammonia::clean_text(&message.id),
            ammonia::clean_text(sender_name),
            self.to_html(&message.message),
            message.created_at.format("%Y-%m-%d %H:%M")
        )
    }
}
