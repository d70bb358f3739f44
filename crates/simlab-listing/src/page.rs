/// One page of a listing. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items: Vec<T>,
  pub page: usize,
  pub total_pages: usize,
  pub total_items: usize,
}

impl<T> Page<T> {
  pub fn has_next(&self) -> bool {
    self.page < self.total_pages
  }

  pub fn has_prev(&self) -> bool {
    self.page > 1
  }
}

/// Slice `items` into pages of `per_page` and return the requested one.
///
/// `page` is clamped into `1..=total_pages`; an empty listing has a single
/// empty page.
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
  let per_page = per_page.max(1);
  let total_items = items.len();
  let total_pages = total_items.div_ceil(per_page).max(1);
  let page = page.clamp(1, total_pages);

  let start = (page - 1) * per_page;
  let end = (start + per_page).min(total_items);

  Page {
    items: items[start.min(total_items)..end].to_vec(),
    page,
    total_pages,
    total_items,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_middle_page() {
    let items: Vec<u32> = (1..=25).collect();
    let page = paginate(&items, 2, 10);
    assert_eq!(page.items, (11..=20).collect::<Vec<_>>());
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next());
    assert!(page.has_prev());
  }

  #[test]
  fn test_last_page_is_partial() {
    let items: Vec<u32> = (1..=25).collect();
    let page = paginate(&items, 3, 10);
    assert_eq!(page.items, vec![21, 22, 23, 24, 25]);
    assert!(!page.has_next());
  }

  #[test]
  fn test_page_is_clamped() {
    let items: Vec<u32> = (1..=5).collect();
    assert_eq!(paginate(&items, 0, 2).page, 1);

    let beyond = paginate(&items, 99, 2);
    assert_eq!(beyond.page, 3);
    assert_eq!(beyond.items, vec![5]);
  }

  #[test]
  fn test_empty_listing() {
    let items: Vec<u32> = Vec::new();
    let page = paginate(&items, 4, 10);
    assert_eq!(page.page, 1);
    assert_eq!(page.total_pages, 1);
    assert!(page.items.is_empty());
    assert!(!page.has_next());
    assert!(!page.has_prev());
  }

  #[test]
  fn test_zero_per_page_is_one() {
    let items = vec!['a', 'b'];
    let page = paginate(&items, 2, 0);
    assert_eq!(page.items, vec!['b']);
    assert_eq!(page.total_pages, 2);
  }
}
