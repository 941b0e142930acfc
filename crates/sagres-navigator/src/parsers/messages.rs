//! Messages printed on the start page.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use scraper::{ElementRef, Html};

use super::{first, selector, text_of};
use crate::model::Message;

/// Profile marker of messages scraped from HTML.
pub const HTML_PROFILE: i32 = -2;

pub fn extract_messages(document: &Html) -> Vec<Message> {
    document
        .select(&selector("article"))
        .filter_map(message)
        .collect()
}

fn message(article: ElementRef<'_>) -> Option<Message> {
    let content = first(article, r#"p[class="recado-texto"]"#)
        .map(|p| p.text().collect::<String>())
        .map(|text| {
            let text = text.trim();
            text.strip_prefix("Descrição do Recado:")
                .unwrap_or(text)
                .trim()
                .to_string()
        })?;

    let scope = first(article, r#"span[class="recado-escopo"]"#).map(text_of);
    let dated = first(article, r#"span[class="recado-data"]"#).map(text_of);
    let sender = first(article, r#"i[class="recado-remetente"]"#).map(|i| {
        let text = text_of(i);
        text.strip_prefix("De").unwrap_or(&text).trim().to_string()
    });

    let attachment = first(article, r#"span[class="material_apoio_arquivo"]"#);
    let attachment_link = attachment
        .and_then(|span| first(span, "a[href]"))
        .and_then(|a| a.attr("href"))
        .map(str::to_string);
    let attachment_name = attachment
        .and_then(|span| first(span, "a[href]"))
        .map(text_of)
        .filter(|name| !name.is_empty());

    Some(Message {
        id: content_id(&content),
        content,
        sender_profile: HTML_PROFILE,
        sender_name: sender,
        discipline: scope,
        date_string: dated,
        attachment_link,
        attachment_name,
        from_html: true,
        ..Message::default()
    })
}

/// Messages on the start page have no id; derive one from the text.
fn content_id(content: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    content.to_lowercase().hash(&mut hasher);
    hasher.finish() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_articles() {
        let doc = Html::parse_document(
            r#"<article>
                 <span class="recado-escopo">EXA801 - Cálculo I</span>
                 <span class="recado-data">02/03/2019</span>
                 <i class="recado-remetente">De MARIA</i>
                 <p class="recado-texto">Descrição do Recado:
                    Prova adiada.</p>
                 <span class="material_apoio_arquivo"><a href="/files/1.pdf">lista.pdf</a></span>
               </article>
               <article><p>no text block</p></article>"#,
        );
        let messages = extract_messages(&doc);
        assert_eq!(messages.len(), 1);
        let m = &messages[0];
        assert_eq!(m.content, "Prova adiada.");
        assert_eq!(m.sender_name.as_deref(), Some("MARIA"));
        assert_eq!(m.discipline.as_deref(), Some("EXA801 - Cálculo I"));
        assert_eq!(m.date_string.as_deref(), Some("02/03/2019"));
        assert_eq!(m.attachment_link.as_deref(), Some("/files/1.pdf"));
        assert!(m.from_html);
        assert_eq!(m.id, content_id("prova adiada."));
    }
}
