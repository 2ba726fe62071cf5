//! Bridges caller page requests and store start keys through the signed
//! cursor codec.

use soundshelf_core::cursor::{CursorCodec, Page, PageRequest, StartKey};
use soundshelf_core::error::CoreError;
use soundshelf_db::repositories::EntityPage;

use crate::config::LibraryConfig;

#[derive(Debug, Clone)]
pub struct Pager {
    codec: CursorCodec,
    default_limit: usize,
    max_limit: usize,
}

impl Pager {
    pub fn new(codec: CursorCodec, default_limit: usize, max_limit: usize) -> Self {
        Self {
            codec,
            default_limit: default_limit.max(1),
            max_limit: max_limit.max(1),
        }
    }

    pub fn from_config(config: &LibraryConfig) -> Self {
        Self::new(
            CursorCodec::new(&config.cursor_secret),
            config.page_default_limit,
            config.page_max_limit,
        )
    }

    /// Effective limit and decoded start position of a request.
    pub fn start(&self, request: &PageRequest) -> Result<(usize, Option<StartKey>), CoreError> {
        let limit = request.effective_limit(self.default_limit, self.max_limit);
        let start = request
            .cursor
            .as_deref()
            .map(|token| self.codec.decode(token))
            .transpose()?;
        Ok((limit, start))
    }

    /// Wrap a repository page, encoding its resume position.
    pub fn finish<T>(&self, page: EntityPage<T>) -> Result<Page<T>, CoreError> {
        let next_cursor = page
            .last_key
            .as_ref()
            .map(|key| self.codec.encode(key))
            .transpose()?;
        Ok(Page {
            items: page.items,
            has_more: next_cursor.is_some(),
            next_cursor,
        })
    }
}
