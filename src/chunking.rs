use async_trait::async_trait;
use futures::future::try_join_all;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::chat::{ChatMessage, OpenRouterChat};
use crate::error::{AppError, Result};
use crate::ocr::{OcrOutput, Page, PageImage};
use crate::Config;

/// Markdown placeholder an OCR page uses to reference its `N`-th image.
static IMAGE_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[img-(\d+)\.jpeg\]\(img-\d+\.jpeg\)").unwrap());

const SPLIT_SYSTEM_PROMPT: &str = "You are a helpful assistant that will parse given text into logical chunks. \
Every word should not be lost and should be in output list. \
Output ONLY a JSON list of strings, where each string is one logical chunk \
that a student can learn independently. If you see like \"![img-0.jpeg](img-0.jpeg)\", \
it should be treated as separate chunk.";

/// Splits one OCR page's markdown into an ordered list of chunk strings.
#[async_trait]
pub trait ChunkSplitter: Send + Sync {
    async fn split_page(&self, page: &Page) -> Result<Vec<String>>;
}

/// Splitter backed by an OpenRouter chat model: one completion per page,
/// replying with a JSON list of chunk strings.
pub struct LlmSplitter {
    chat: OpenRouterChat,
    model: String,
}

impl LlmSplitter {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            chat: OpenRouterChat::from_config(config)?,
            model: config.splitter_model.clone(),
        })
    }
}

#[async_trait]
impl ChunkSplitter for LlmSplitter {
    async fn split_page(&self, page: &Page) -> Result<Vec<String>> {
        let messages = vec![
            ChatMessage::system(SPLIT_SYSTEM_PROMPT.to_string()),
            ChatMessage::user(page.markdown.clone()),
        ];
        let reply = self.chat.complete_raw(&messages, &self.model).await?;
        parse_chunk_list(&reply)
    }
}

/// Parse the splitter model's reply into a list of chunk strings. The reply is
/// a JSON list, possibly wrapped in a markdown code fence.
pub fn parse_chunk_list(reply: &str) -> Result<Vec<String>> {
    let mut body = reply.trim();
    if let Some(stripped) = body.strip_prefix("```") {
        body = stripped
            .strip_prefix("json")
            .unwrap_or(stripped)
            .trim_start();
        body = body.strip_suffix("```").unwrap_or(body).trim_end();
    }
    serde_json::from_str::<Vec<String>>(body)
        .map_err(|e| AppError::provider("splitter", format!("unparseable chunk list: {e}")))
}

/// Resolve `![img-N.jpeg](img-N.jpeg)` placeholders in one chunk against the
/// page's image list. A chunk that is nothing but a placeholder becomes the
/// image's data URL outright; placeholders inside prose are replaced inline.
pub fn substitute_images(chunk: &str, images: &[PageImage]) -> Result<String> {
    let trimmed = chunk.trim();
    if !IMAGE_PLACEHOLDER.is_match(trimmed) {
        return Ok(chunk.to_string());
    }

    for caps in IMAGE_PLACEHOLDER.captures_iter(trimmed) {
        let index: usize = caps[1]
            .parse()
            .map_err(|_| AppError::provider("splitter", "non-numeric image placeholder"))?;
        if index >= images.len() {
            return Err(AppError::provider(
                "splitter",
                format!("image placeholder {index} out of range ({} images)", images.len()),
            ));
        }
    }

    if let Some(m) = IMAGE_PLACEHOLDER.find(trimmed) {
        if m.start() == 0 && m.end() == trimmed.len() {
            let index: usize = IMAGE_PLACEHOLDER.captures(trimmed).unwrap()[1].parse().unwrap();
            return Ok(images[index].base64.clone());
        }
    }

    let replaced = IMAGE_PLACEHOLDER.replace_all(trimmed, |caps: &regex::Captures| {
        let index: usize = caps[1].parse().unwrap();
        images[index].base64.clone()
    });
    Ok(replaced.into_owned())
}

/// Split every page of one OCR result concurrently, substitute image
/// placeholders, and flatten in page-then-chunk order.
pub async fn split_document(
    splitter: &dyn ChunkSplitter,
    output: &OcrOutput,
) -> Result<Vec<String>> {
    let page_chunks = try_join_all(output.pages.iter().map(|page| splitter.split_page(page))).await?;

    let mut flattened = Vec::new();
    for (page, chunks) in output.pages.iter().zip(page_chunks) {
        for chunk in chunks {
            flattened.push(substitute_images(&chunk, &page.images)?);
        }
    }
    Ok(flattened)
}
