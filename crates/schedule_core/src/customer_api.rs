use crate::error::AppError;
use crate::model::Customer;
use crate::storage::json_store;
use log::info;
use std::path::Path;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Tag given to customers entered without any.
pub const DEFAULT_TAG: &str = "手动录入";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewCustomer {
    pub name: String,
    pub company: String,
    pub role: String,
    pub industry: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Free text split on `，`, `,` or spaces.
    pub tags: String,
}

pub fn add_customer(new_customer: NewCustomer) -> Result<Customer, AppError> {
    let path = json_store::store_path()?;
    add_customer_with_path(&path, new_customer)
}

pub fn list_customers() -> Result<Vec<Customer>, AppError> {
    let path = json_store::store_path()?;
    Ok(json_store::load_state(&path)?.customers)
}

pub fn search_customers(term: &str, tag: Option<&str>) -> Result<Vec<Customer>, AppError> {
    let path = json_store::store_path()?;
    let customers = json_store::load_state(&path)?.customers;
    Ok(filter_customers(&customers, term, tag))
}

pub fn get_customer(id: &str) -> Result<Customer, AppError> {
    let path = json_store::store_path()?;
    get_customer_with_path(&path, id)
}

pub fn add_customer_tags(id: &str, raw: &str) -> Result<Customer, AppError> {
    let path = json_store::store_path()?;
    add_customer_tags_with_path(&path, id, raw)
}

pub fn remove_customer_tag(id: &str, tag: &str) -> Result<Customer, AppError> {
    let path = json_store::store_path()?;
    remove_customer_tag_with_path(&path, id, tag)
}

/// Every distinct tag in the directory, in first-seen order.
pub fn all_tags() -> Result<Vec<String>, AppError> {
    let path = json_store::store_path()?;
    Ok(distinct_tags(&json_store::load_state(&path)?.customers))
}

/// Tags for a new customer; falls back to [`DEFAULT_TAG`] when `raw` has none.
pub fn split_tags(raw: &str) -> Vec<String> {
    let tags: Vec<String> = tag_pieces(raw).map(str::to_string).collect();
    if tags.is_empty() {
        vec![DEFAULT_TAG.to_string()]
    } else {
        tags
    }
}

fn tag_pieces(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(['，', ',', ' '])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
}

fn push_unique(tags: &mut Vec<String>, tag: &str) {
    if !tags.iter().any(|existing| existing == tag) {
        tags.push(tag.to_string());
    }
}

fn distinct_tags(customers: &[Customer]) -> Vec<String> {
    let mut tags = Vec::new();
    for tag in customers.iter().flat_map(|customer| &customer.tags) {
        push_unique(&mut tags, tag);
    }
    tags
}

fn find_customer_mut<'a>(
    customers: &'a mut [Customer],
    id: &str,
) -> Result<&'a mut Customer, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }
    customers
        .iter_mut()
        .find(|customer| customer.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("customer not found"))
}

fn add_customer_tags_with_path(path: &Path, id: &str, raw: &str) -> Result<Customer, AppError> {
    if tag_pieces(raw).next().is_none() {
        return Err(AppError::invalid_input("tag is required"));
    }

    let mut state = json_store::load_state(path)?;
    let customer = find_customer_mut(&mut state.customers, id)?;
    for tag in tag_pieces(raw) {
        push_unique(&mut customer.tags, tag);
    }
    let updated = customer.clone();

    json_store::save_state(path, &state)?;
    info!("customer {} tags: {}", updated.id, updated.tags.join(","));

    Ok(updated)
}

fn remove_customer_tag_with_path(path: &Path, id: &str, tag: &str) -> Result<Customer, AppError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(AppError::invalid_input("tag is required"));
    }

    let mut state = json_store::load_state(path)?;
    let customer = find_customer_mut(&mut state.customers, id)?;
    let before = customer.tags.len();
    customer.tags.retain(|existing| existing != tag);
    if customer.tags.len() == before {
        return Err(AppError::not_found("tag not found"));
    }
    let updated = customer.clone();

    json_store::save_state(path, &state)?;
    info!("customer {} tags: {}", updated.id, updated.tags.join(","));

    Ok(updated)
}

pub(crate) fn add_customer_with_path(
    path: &Path,
    new_customer: NewCustomer,
) -> Result<Customer, AppError> {
    let name = new_customer.name.trim();
    if name.is_empty() {
        return Err(AppError::invalid_input("name is required"));
    }
    let company = new_customer.company.trim();
    if company.is_empty() {
        return Err(AppError::invalid_input("company is required"));
    }

    let now = OffsetDateTime::now_utc();
    let created_at = now
        .format(&Rfc3339)
        .map_err(|err| AppError::invalid_data(err.to_string()))?;
    let optional = |value: Option<String>| {
        value
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    };

    let customer = Customer {
        id: format!("manual-{}", now.unix_timestamp_nanos()),
        name: name.to_string(),
        company: company.to_string(),
        role: new_customer.role.trim().to_string(),
        industry: new_customer.industry.trim().to_string(),
        email: optional(new_customer.email),
        phone: optional(new_customer.phone),
        tags: split_tags(&new_customer.tags),
        created_at,
    };

    // Newest first, so name matching prefers the latest entry.
    let mut state = json_store::load_state(path)?;
    state.customers.insert(0, customer.clone());
    json_store::save_state(path, &state)?;
    info!("added customer {} ({})", customer.id, customer.company);

    Ok(customer)
}

fn filter_customers(customers: &[Customer], term: &str, tag: Option<&str>) -> Vec<Customer> {
    let term = term.trim();
    customers
        .iter()
        .filter(|customer| {
            customer.name.contains(term)
                || customer.company.contains(term)
                || customer.industry.contains(term)
                || customer.tags.iter().any(|t| t.contains(term))
        })
        .filter(|customer| tag.is_none_or(|tag| customer.tags.iter().any(|t| t == tag)))
        .cloned()
        .collect()
}

fn get_customer_with_path(path: &Path, id: &str) -> Result<Customer, AppError> {
    let trimmed_id = id.trim();
    if trimmed_id.is_empty() {
        return Err(AppError::invalid_input("id is required"));
    }

    json_store::load_state(path)?
        .customers
        .into_iter()
        .find(|customer| customer.id == trimmed_id)
        .ok_or_else(|| AppError::not_found("customer not found"))
}

#[cfg(test)]
mod tests {
    use super::{
        DEFAULT_TAG, NewCustomer, add_customer_tags_with_path, add_customer_with_path,
        distinct_tags, filter_customers, get_customer_with_path, remove_customer_tag_with_path,
        split_tags,
    };
    use crate::storage::json_store;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(file_name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("sales-schedule-{nanos}-{file_name}"))
    }

    fn new_customer(name: &str, company: &str, tags: &str) -> NewCustomer {
        NewCustomer {
            name: name.to_string(),
            company: company.to_string(),
            industry: "制造".to_string(),
            tags: tags.to_string(),
            ..NewCustomer::default()
        }
    }

    #[test]
    fn split_tags_accepts_mixed_separators() {
        assert_eq!(split_tags("重点，华东, 续约  VIP"), vec!["重点", "华东", "续约", "VIP"]);
        assert_eq!(split_tags(" ，, "), vec![DEFAULT_TAG]);
    }

    #[test]
    fn add_customer_requires_name_and_company() {
        let path = temp_path("customer-required.json");

        let no_name = add_customer_with_path(&path, new_customer(" ", "星河科技", "")).unwrap_err();
        let no_company = add_customer_with_path(&path, new_customer("张总", "", "")).unwrap_err();

        assert_eq!(no_name.code(), "invalid_input");
        assert_eq!(no_company.code(), "invalid_input");
        assert!(!path.exists());
    }

    #[test]
    fn add_customer_persists_and_can_be_fetched() {
        let path = temp_path("customer-add.json");
        let mut input = new_customer(" 张总 ", "星河科技", "");
        input.email = Some("  ".to_string());
        input.phone = Some(" 13800000000 ".to_string());

        let added = add_customer_with_path(&path, input).unwrap();
        let fetched = get_customer_with_path(&path, &added.id).unwrap();
        let missing = get_customer_with_path(&path, "manual-404").unwrap_err();
        let stored = json_store::load_state(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert!(added.id.starts_with("manual-"));
        assert_eq!(added.name, "张总");
        assert_eq!(added.email, None);
        assert_eq!(added.phone.as_deref(), Some("13800000000"));
        assert_eq!(added.tags, vec![DEFAULT_TAG]);
        assert_eq!(fetched, added);
        assert_eq!(missing.code(), "not_found");
        assert_eq!(stored.customers.len(), 1);
    }

    #[test]
    fn filter_matches_any_field_and_exact_tag() {
        let path = temp_path("customer-filter.json");
        let a = add_customer_with_path(&path, new_customer("张总", "星河科技", "重点,华东")).unwrap();
        let b = add_customer_with_path(&path, new_customer("李经理", "远山物流", "华东重点区")).unwrap();
        let customers = json_store::load_state(&path).unwrap().customers;
        std::fs::remove_file(&path).ok();

        let by_company = filter_customers(&customers, "星河", None);
        let by_tag_text = filter_customers(&customers, "重点", None);
        let exact_tag = filter_customers(&customers, "", Some("重点"));
        let by_industry = filter_customers(&customers, "制造", None);

        assert_eq!(by_company, vec![a.clone()]);
        assert_eq!(by_tag_text, vec![b.clone(), a.clone()]);
        assert_eq!(exact_tag, vec![a]);
        assert_eq!(by_industry.len(), 2);
        assert!(by_industry.contains(&b));
    }

    #[test]
    fn newest_customer_is_listed_first() {
        let path = temp_path("customer-order.json");
        let older = add_customer_with_path(&path, new_customer("张总", "星河科技", "")).unwrap();
        let newer = add_customer_with_path(&path, new_customer("张总", "远山物流", "")).unwrap();
        let customers = json_store::load_state(&path).unwrap().customers;
        std::fs::remove_file(&path).ok();

        assert_eq!(customers, vec![newer, older]);
    }

    #[test]
    fn add_tags_merges_without_duplicates() {
        let path = temp_path("customer-tag-add.json");
        let customer =
            add_customer_with_path(&path, new_customer("张总", "星河科技", "重点,华东")).unwrap();

        let updated =
            add_customer_tags_with_path(&path, &customer.id, "华东，续约 重点 续约").unwrap();
        let blank = add_customer_tags_with_path(&path, &customer.id, " ，, ").unwrap_err();
        let missing = add_customer_tags_with_path(&path, "manual-404", "VIP").unwrap_err();
        let stored = get_customer_with_path(&path, &customer.id).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(updated.tags, vec!["重点", "华东", "续约"]);
        assert_eq!(stored, updated);
        assert_eq!(blank.code(), "invalid_input");
        assert_eq!(missing.code(), "not_found");
    }

    #[test]
    fn remove_tag_drops_only_that_tag() {
        let path = temp_path("customer-tag-remove.json");
        let customer =
            add_customer_with_path(&path, new_customer("张总", "星河科技", "重点,华东")).unwrap();

        let updated = remove_customer_tag_with_path(&path, &customer.id, " 重点 ").unwrap();
        let again = remove_customer_tag_with_path(&path, &customer.id, "重点").unwrap_err();
        let stored = get_customer_with_path(&path, &customer.id).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(updated.tags, vec!["华东"]);
        assert_eq!(stored.tags, vec!["华东"]);
        assert_eq!(again.code(), "not_found");
    }

    #[test]
    fn distinct_tags_keeps_first_seen_order() {
        let path = temp_path("customer-all-tags.json");
        add_customer_with_path(&path, new_customer("张总", "星河科技", "重点,华东")).unwrap();
        add_customer_with_path(&path, new_customer("李经理", "远山物流", "华东 物流")).unwrap();
        let customers = json_store::load_state(&path).unwrap().customers;
        std::fs::remove_file(&path).ok();

        assert_eq!(distinct_tags(&customers), vec!["华东", "物流", "重点"]);
        assert!(distinct_tags(&[]).is_empty());
    }
}
