use serde::Serialize;

pub const MAX_PER_PAGE: i64 = 100;
const DEFAULT_PER_PAGE: i64 = 20;

#[derive(Serialize)]
pub struct Meta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

#[derive(Serialize)]
pub struct Entity<T> {
    pub data: T,
}

impl<T> Paginated<T> {
    pub fn new(data: Vec<T>, page: i64, per_page: i64, total: i64) -> Self {
        Paginated {
            data,
            meta: Meta {
                page,
                per_page,
                total,
                total_pages: if total == 0 {
                    0
                } else {
                    (total + per_page - 1) / per_page
                },
            },
        }
    }
}

/// Normalize user-supplied pagination: 1-based page, per_page clamped.
pub fn page_params(page: Option<i64>, per_page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);
    (page, per_page)
}

pub fn offset(page: i64, per_page: i64) -> i64 {
    (page - 1) * per_page
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn per_page_is_clamped_to_the_contract_range() {
        assert_eq!(page_params(None, Some(0)), (1, 1));
        assert_eq!(page_params(None, Some(-5)), (1, 1));
        assert_eq!(page_params(None, Some(1000)), (1, 100));
        assert_eq!(page_params(None, None), (1, 20));
    }

    #[test]
    fn page_floors_at_one() {
        assert_eq!(page_params(Some(0), None).0, 1);
        assert_eq!(page_params(Some(-3), None).0, 1);
        assert_eq!(offset(1, 20), 0);
        assert_eq!(offset(3, 20), 40);
    }

    #[test]
    fn total_pages_rounds_up() {
        let page = Paginated::new(vec![1, 2, 3], 1, 20, 41);
        assert_eq!(page.meta.total_pages, 3);

        let empty = Paginated::<i32>::new(vec![], 1, 20, 0);
        assert_eq!(empty.meta.total_pages, 0);
    }
}
