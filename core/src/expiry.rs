//! Expiry and ordering computations.
//!
//! Everything in here is pure: callers pass `today` and the display language
//! explicitly instead of reading them from ambient state.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::{Locale, locale};
use serde::Serialize;
use tracing::warn;

use crate::models::{
    FoodItem, FridgeSortCriteria, Language, ShoppingListItem, ShoppingSortCriteria, SortDirection,
};

/// Urgency window, in days, for items that are about to expire.
pub const EXPIRING_SOON_DAYS: i64 = 3;

/// Effective expiry date of an item.
///
/// A manual date always wins. Without one, both the purchase date and the
/// shelf life are needed.
#[must_use]
pub fn compute_expiry_date(
    purchase_date: Option<NaiveDate>,
    shelf_life_days: Option<u32>,
    manual_expiry_date: Option<NaiveDate>,
) -> Option<NaiveDate> {
    if let Some(manual) = manual_expiry_date {
        return Some(manual);
    }
    let purchase = purchase_date?;
    let days = shelf_life_days?;
    purchase.checked_add_signed(Duration::days(i64::from(days)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Expired,
    ExpiresToday,
    ExpiringSoon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Urgency {
    pub severity: Severity,
    pub days_remaining: i64,
}

impl Urgency {
    #[must_use]
    pub fn label(&self, language: Language) -> String {
        match (self.severity, language) {
            (Severity::Expired, Language::ZhTw) => "已過期".to_string(),
            (Severity::Expired, Language::EnUs) => "Expired".to_string(),
            (Severity::Expired, Language::JaJp) => "期限切れ".to_string(),
            (Severity::ExpiresToday, Language::ZhTw) => "今天過期".to_string(),
            (Severity::ExpiresToday, Language::EnUs) => "Expires today".to_string(),
            (Severity::ExpiresToday, Language::JaJp) => "今日が期限です".to_string(),
            (Severity::ExpiringSoon, Language::ZhTw) => {
                format!("將於 {} 天後過期", self.days_remaining)
            }
            (Severity::ExpiringSoon, Language::EnUs) => {
                let unit = if self.days_remaining == 1 { "day" } else { "days" };
                format!("Expires in {} {unit}", self.days_remaining)
            }
            (Severity::ExpiringSoon, Language::JaJp) => {
                format!("期限まであと {} 日", self.days_remaining)
            }
        }
    }
}

/// Urgency bucket for an item, or `None` when it is not close to expiring
/// or its expiry date is unknown.
#[must_use]
pub fn compute_urgency(item: &FoodItem, today: NaiveDate) -> Option<Urgency> {
    let expiry = item.expiry_date()?;
    let days_remaining = (expiry - today).num_days();
    let severity = match days_remaining {
        d if d < 0 => Severity::Expired,
        0 => Severity::ExpiresToday,
        d if d <= EXPIRING_SOON_DAYS => Severity::ExpiringSoon,
        _ => return None,
    };
    Some(Urgency {
        severity,
        days_remaining,
    })
}

/// Whether an item may be offered to the recipe generator.
///
/// Items with no known expiry count as eligible.
#[must_use]
pub fn is_eligible_for_recipe(item: &FoodItem, today: NaiveDate) -> bool {
    item.expiry_date().is_none_or(|expiry| expiry >= today)
}

/// Names of every eligible item, in the order given.
#[must_use]
pub fn eligible_ingredient_names(items: &[FoodItem], today: NaiveDate) -> Vec<String> {
    items
        .iter()
        .filter(|item| is_eligible_for_recipe(item, today))
        .map(|item| item.name.clone())
        .collect()
}

/// Fallback sort key used when no collator is available.
///
/// Folds case and full-width Latin forms. Japanese also folds katakana onto
/// hiragana so that カブ and かぶ sort together.
#[must_use]
pub fn collation_key(name: &str, language: Language) -> String {
    name.chars()
        .map(|c| {
            let c = match c {
                '\u{FF01}'..='\u{FF5E}' => char::from_u32(u32::from(c) - 0xFEE0).unwrap_or(c),
                '\u{3000}' => ' ',
                _ => c,
            };
            if language == Language::JaJp && ('\u{30A1}'..='\u{30F6}').contains(&c) {
                char::from_u32(u32::from(c) - 0x60).unwrap_or(c)
            } else {
                c
            }
        })
        .flat_map(char::to_lowercase)
        .collect()
}

fn collation_locale(language: Language) -> Locale {
    match language {
        // Chinese names sort by pinyin in every script.
        Language::ZhTw => locale!("zh"),
        Language::EnUs => locale!("en"),
        Language::JaJp => locale!("ja"),
    }
}

/// Locale-aware name ordering for one display language.
pub struct NameCollator {
    language: Language,
    collator: Option<Collator>,
}

impl NameCollator {
    #[must_use]
    pub fn new(language: Language) -> Self {
        let collator =
            match Collator::try_new(&collation_locale(language).into(), CollatorOptions::new()) {
                Ok(collator) => Some(collator),
                Err(e) => {
                    warn!(%language, error = %e, "collator unavailable, using folded code point order");
                    None
                }
            };
        Self { language, collator }
    }

    /// Total order: collation first, raw string on ties.
    #[must_use]
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let collated = match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => collation_key(a, self.language).cmp(&collation_key(b, self.language)),
        };
        collated.then_with(|| a.cmp(b))
    }
}

/// Unknown dates compare after every known date.
fn compare_optional_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Stable ascending sort by `criteria`, then a full reversal for descending.
///
/// The reversal is applied to the whole list, so unknown expiry dates come
/// first when sorting by expiry descending, and ties swap their relative order.
pub fn sort_food_items(
    items: &mut [FoodItem],
    criteria: FridgeSortCriteria,
    direction: SortDirection,
    language: Language,
) {
    match criteria {
        FridgeSortCriteria::ExpiryDate => {
            items.sort_by(|a, b| compare_optional_dates(a.expiry_date(), b.expiry_date()));
        }
        FridgeSortCriteria::PurchaseDate => items.sort_by_key(|item| item.purchase_date),
        FridgeSortCriteria::Name => {
            let collator = NameCollator::new(language);
            items.sort_by(|a, b| collator.compare(&a.name, &b.name));
        }
        FridgeSortCriteria::AddedAt => items.sort_by_key(|item| item.added_at),
    }
    if direction == SortDirection::Desc {
        items.reverse();
    }
}

pub fn sort_shopping_items(
    items: &mut [ShoppingListItem],
    criteria: ShoppingSortCriteria,
    direction: SortDirection,
    language: Language,
) {
    match criteria {
        ShoppingSortCriteria::AddedAt => items.sort_by_key(|item| item.added_at),
        ShoppingSortCriteria::Name => {
            let collator = NameCollator::new(language);
            items.sort_by(|a, b| collator.compare(&a.name, &b.name));
        }
    }
    if direction == SortDirection::Desc {
        items.reverse();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn item(name: &str, purchase: &str, shelf: Option<u32>, manual: Option<&str>) -> FoodItem {
        FoodItem {
            id: 0,
            name: name.to_string(),
            quantity: "1".to_string(),
            purchase_date: date(purchase),
            manual_expiry_date: manual.map(date),
            storage_location: None,
            shelf_life_days: shelf,
            added_at: DateTime::UNIX_EPOCH,
        }
    }

    fn names(items: &[FoodItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[test]
    fn test_compute_expiry_from_shelf_life() {
        assert_eq!(
            compute_expiry_date(Some(date("2024-01-01")), Some(10), None),
            Some(date("2024-01-11"))
        );
    }

    #[test]
    fn test_manual_expiry_ignores_other_inputs() {
        let manual = Some(date("2024-03-05"));
        for (purchase, shelf) in [
            (None, None),
            (Some(date("2024-01-01")), Some(10)),
            (Some(date("2030-12-31")), Some(0)),
            (None, Some(400)),
        ] {
            assert_eq!(compute_expiry_date(purchase, shelf, manual), manual);
        }
    }

    #[test]
    fn test_expiry_unknown_without_shelf_life() {
        assert_eq!(compute_expiry_date(Some(date("2024-01-01")), None, None), None);
        assert_eq!(compute_expiry_date(None, Some(5), None), None);
    }

    #[test]
    fn test_urgency_buckets() {
        let today = date("2024-01-10");
        let expired = item("a", "2024-01-01", Some(8), None);
        let due_today = item("b", "2024-01-01", Some(9), None);
        let soon = item("c", "2024-01-01", Some(12), None);
        let later = item("d", "2024-01-01", Some(20), None);
        let unknown = item("e", "2024-01-01", None, None);

        let u = compute_urgency(&expired, today).unwrap();
        assert_eq!(u.severity, Severity::Expired);
        assert_eq!(u.days_remaining, -1);

        let u = compute_urgency(&due_today, today).unwrap();
        assert_eq!(u.severity, Severity::ExpiresToday);

        let u = compute_urgency(&soon, today).unwrap();
        assert_eq!(u.severity, Severity::ExpiringSoon);
        assert_eq!(u.days_remaining, 3);

        assert!(compute_urgency(&later, today).is_none());
        assert!(compute_urgency(&unknown, today).is_none());
    }

    #[test]
    fn test_urgency_window_ends_after_three_days() {
        let today = date("2024-01-10");
        let three = item("three", "2024-01-10", Some(3), None);
        let four = item("four", "2024-01-10", Some(4), None);

        let u = compute_urgency(&three, today).unwrap();
        assert_eq!(u.severity, Severity::ExpiringSoon);
        assert_eq!(u.days_remaining, EXPIRING_SOON_DAYS);
        assert!(compute_urgency(&four, today).is_none());
    }

    #[test]
    fn test_urgency_labels() {
        let soon = Urgency {
            severity: Severity::ExpiringSoon,
            days_remaining: 2,
        };
        assert_eq!(soon.label(Language::EnUs), "Expires in 2 days");
        assert_eq!(soon.label(Language::ZhTw), "將於 2 天後過期");
        assert_eq!(soon.label(Language::JaJp), "期限まであと 2 日");

        let one = Urgency {
            severity: Severity::ExpiringSoon,
            days_remaining: 1,
        };
        assert_eq!(one.label(Language::EnUs), "Expires in 1 day");

        let expired = Urgency {
            severity: Severity::Expired,
            days_remaining: -4,
        };
        assert_eq!(expired.label(Language::JaJp), "期限切れ");
    }

    #[test]
    fn test_eligibility() {
        let today = date("2024-01-10");
        assert!(is_eligible_for_recipe(&item("x", "2020-01-01", None, None), today));
        assert!(is_eligible_for_recipe(
            &item("x", "2024-01-01", None, Some("2024-01-10")),
            today
        ));
        assert!(!is_eligible_for_recipe(
            &item("x", "2024-01-01", Some(30), Some("2024-01-09")),
            today
        ));
    }

    #[test]
    fn test_eligible_ingredient_names_keeps_order() {
        let today = date("2024-01-10");
        let items = vec![
            item("Tofu", "2024-01-09", Some(5), None),
            item("Old milk", "2024-01-01", Some(2), None),
            item("Rice", "2024-01-01", None, None),
        ];
        assert_eq!(eligible_ingredient_names(&items, today), vec!["Tofu", "Rice"]);
    }

    #[test]
    fn test_sort_unknown_expiry_last_ascending_first_descending() {
        let mut items = vec![
            item("unknown", "2024-01-01", None, None),
            item("far", "2024-01-01", None, Some("2099-01-01")),
            item("near", "2024-01-01", Some(1), None),
        ];
        sort_food_items(
            &mut items,
            FridgeSortCriteria::ExpiryDate,
            SortDirection::Asc,
            Language::EnUs,
        );
        assert_eq!(names(&items), vec!["near", "far", "unknown"]);

        sort_food_items(
            &mut items,
            FridgeSortCriteria::ExpiryDate,
            SortDirection::Desc,
            Language::EnUs,
        );
        assert_eq!(names(&items), vec!["unknown", "far", "near"]);
    }

    #[test]
    fn test_sort_descending_reverses_ties() {
        let mut items = vec![
            item("first", "2024-01-01", None, None),
            item("second", "2024-01-01", None, None),
        ];
        sort_food_items(
            &mut items,
            FridgeSortCriteria::PurchaseDate,
            SortDirection::Desc,
            Language::EnUs,
        );
        assert_eq!(names(&items), vec!["second", "first"]);
    }

    #[test]
    fn test_sort_by_name_folds_case() {
        let mut items = vec![
            item("banana", "2024-01-01", None, None),
            item("Apple", "2024-01-01", None, None),
            item("cherry", "2024-01-01", None, None),
        ];
        sort_food_items(
            &mut items,
            FridgeSortCriteria::Name,
            SortDirection::Asc,
            Language::EnUs,
        );
        assert_eq!(names(&items), vec!["Apple", "banana", "cherry"]);
    }

    fn sorted_by_name(input: &[&str], language: Language) -> Vec<String> {
        let mut items: Vec<FoodItem> = input
            .iter()
            .map(|name| item(name, "2024-01-01", None, None))
            .collect();
        sort_food_items(&mut items, FridgeSortCriteria::Name, SortDirection::Asc, language);
        items.into_iter().map(|i| i.name).collect()
    }

    #[test]
    fn test_sort_by_name_chinese_uses_pinyin() {
        assert_eq!(
            sorted_by_name(&["蘋果", "香蕉", "雞蛋"], Language::ZhTw),
            vec!["雞蛋", "蘋果", "香蕉"]
        );
    }

    #[test]
    fn test_sort_by_name_ignores_accents() {
        assert_eq!(
            sorted_by_name(&["zucchini", "éclair", "egg"], Language::EnUs),
            vec!["éclair", "egg", "zucchini"]
        );
    }

    #[test]
    fn test_sort_by_name_japanese_kana_order() {
        assert_eq!(
            sorted_by_name(&["みかん", "カブ", "アイス"], Language::JaJp),
            vec!["アイス", "カブ", "みかん"]
        );
    }

    #[test]
    fn test_name_collator_breaks_ties_on_raw_string() {
        let collator = NameCollator::new(Language::EnUs);
        assert_eq!(collator.compare("milk", "milk"), Ordering::Equal);
        assert_ne!(collator.compare("Milk", "milk"), Ordering::Equal);
        assert_eq!(
            collator.compare("Milk", "milk"),
            collator.compare("milk", "Milk").reverse()
        );
    }

    #[test]
    fn test_collation_key_japanese_folds_katakana() {
        assert_eq!(collation_key("カブ", Language::JaJp), collation_key("かぶ", Language::JaJp));
        assert_ne!(collation_key("カブ", Language::EnUs), collation_key("かぶ", Language::EnUs));
        assert_eq!(collation_key("ＭＩＬＫ", Language::ZhTw), "milk");
    }

    #[test]
    fn test_sort_shopping_by_added_at_desc() {
        let at = |h| Utc.with_ymd_and_hms(2024, 1, 1, h, 0, 0).unwrap();
        let mut items: Vec<ShoppingListItem> = [("old", 1), ("new", 9), ("legacy", 0)]
            .into_iter()
            .map(|(name, h)| ShoppingListItem {
                id: 0,
                name: name.to_string(),
                unit: None,
                purchased: false,
                added_at: if h == 0 { DateTime::UNIX_EPOCH } else { at(h) },
            })
            .collect();
        sort_shopping_items(
            &mut items,
            ShoppingSortCriteria::AddedAt,
            SortDirection::Desc,
            Language::EnUs,
        );
        let order: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(order, vec!["new", "old", "legacy"]);
    }

    #[test]
    fn test_sort_shopping_by_name() {
        let mut items: Vec<ShoppingListItem> = ["Yogurt", "apples", "Éclairs", "butter"]
            .into_iter()
            .map(|name| ShoppingListItem {
                id: 0,
                name: name.to_string(),
                unit: None,
                purchased: false,
                added_at: DateTime::UNIX_EPOCH,
            })
            .collect();
        sort_shopping_items(
            &mut items,
            ShoppingSortCriteria::Name,
            SortDirection::Asc,
            Language::EnUs,
        );
        let order: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(order, vec!["apples", "butter", "Éclairs", "Yogurt"]);

        sort_shopping_items(
            &mut items,
            ShoppingSortCriteria::Name,
            SortDirection::Desc,
            Language::EnUs,
        );
        let order: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(order, vec!["Yogurt", "Éclairs", "butter", "apples"]);
    }
}
