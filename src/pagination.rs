use serde::Serialize;
use thiserror::Error;

pub const PAGE_PARAM: &str = "page";

/// Page selected by the `page` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    Number(i64),
    Last,
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest::Number(1)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("Page is not 'last', nor can it be converted to an int.")]
    NotANumber,
    #[error("Invalid page ({0}): That page contains no results")]
    OutOfRange(i64),
}

impl PageRequest {
    /// Parses the raw `page` value; a missing value selects the first page.
    pub fn parse(raw: Option<&str>) -> Result<Self, PageError> {
        match raw.map(str::trim) {
            None | Some("") => Ok(PageRequest::default()),
            Some("last") => Ok(PageRequest::Last),
            Some(n) => n
                .parse()
                .map(PageRequest::Number)
                .map_err(|_| PageError::NotANumber),
        }
    }
}

/// Slice of a result set resolved against its total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    /// An empty result set still has one (empty) first page.
    pub fn resolve(request: PageRequest, count: i64, per_page: i64) -> Result<Self, PageError> {
        let num_pages = ((count + per_page - 1) / per_page).max(1);
        let number = match request {
            PageRequest::Last => num_pages,
            PageRequest::Number(n) => n,
        };

        if number < 1 || number > num_pages {
            return Err(PageError::OutOfRange(number));
        }

        Ok(PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * per_page,
            limit: per_page,
        })
    }

    pub fn into_page<T>(self, object_list: Vec<T>) -> Page<T> {
        Page {
            object_list,
            number: self.number,
            num_pages: self.num_pages,
            count: self.count,
            has_previous: self.number > 1,
            has_next: self.number < self.num_pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub object_list: Vec<T>,
    pub number: i64,
    pub num_pages: i64,
    pub count: i64,
    pub has_previous: bool,
    pub has_next: bool,
}
