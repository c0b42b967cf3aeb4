//! Fixed-size paging over ordered post feeds.
//!
//! Out-of-range requests never fail: a missing or malformed page number
//! selects the first page, an integer outside `1..=num_pages` selects the
//! last one. An empty feed still has one (empty) page.

use serde::Serialize;

use crate::domain::{PostDetail, PostFilter};
use crate::error::RepoError;
use crate::ports::PostRepository;

/// Posts shown on every feed page.
pub const POSTS_PER_PAGE: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    count: u64,
    per_page: u64,
}

impl Paginator {
    pub fn new(count: u64, per_page: u64) -> Self {
        Self {
            count,
            per_page: per_page.max(1),
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn num_pages(&self) -> u64 {
        if self.count == 0 {
            1
        } else {
            self.count.div_ceil(self.per_page)
        }
    }

    /// Turn the raw `page` query value into a valid page number.
    pub fn resolve(&self, requested: Option<&str>) -> u64 {
        let last = self.num_pages();
        match requested.and_then(|raw| raw.trim().parse::<i64>().ok()) {
            None => 1,
            Some(n) if n < 1 || n as u64 > last => last,
            Some(n) => n as u64,
        }
    }

    /// Offset and limit of a resolved page.
    pub fn window(&self, number: u64) -> (u64, u64) {
        ((number.max(1) - 1) * self.per_page, self.per_page)
    }

    pub fn page<T>(&self, number: u64, items: Vec<T>) -> Page<T> {
        Page {
            items,
            number,
            num_pages: self.num_pages(),
            count: self.count,
        }
    }
}

/// One page of a feed plus the metadata the paginator widget needs.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: u64,
    pub num_pages: u64,
    pub count: u64,
}

impl<T> Page<T> {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_other_pages(&self) -> bool {
        self.num_pages > 1
    }

    pub fn next_page_number(&self) -> u64 {
        self.number + 1
    }

    pub fn previous_page_number(&self) -> u64 {
        self.number.saturating_sub(1)
    }

    /// One link per page for the paginator widget.
    pub fn links(&self) -> Vec<PageLink> {
        (1..=self.num_pages)
            .map(|number| PageLink {
                number,
                current: number == self.number,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub number: u64,
    pub current: bool,
}

/// Load one page of a filtered feed.
pub async fn feed_page(
    posts: &dyn PostRepository,
    filter: PostFilter,
    requested: Option<&str>,
) -> Result<Page<PostDetail>, RepoError> {
    let paginator = Paginator::new(posts.count(filter).await?, POSTS_PER_PAGE);
    let number = paginator.resolve(requested);
    let (offset, limit) = paginator.window(number);
    let items = posts.feed(filter, offset, limit).await?;

    Ok(paginator.page(number, items))
}
