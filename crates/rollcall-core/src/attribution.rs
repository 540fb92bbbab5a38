//! Company attribution from free-text profile descriptions.
//!
//! Descriptions often name the employer inline ("Engineer @ Acme Corp").
//! Matching is plain case-insensitive substring search, so short company
//! names that are also common words will produce false positives.

/// First company (in list order) named in `description`, or an empty string.
pub fn assign_company(description: &str, companies: &[String]) -> String {
    find_company(description, companies)
        .map(str::to_string)
        .unwrap_or_default()
}

/// Company for a scraped row: the attributed company if the description
/// names one, otherwise the company whose listing is being traversed.
pub fn resolve_company(description: &str, companies: &[String], listing_company: &str) -> String {
    find_company(description, companies)
        .unwrap_or(listing_company)
        .to_string()
}

/// Like [`assign_company`], borrowing the matched name.
pub fn find_company<'a>(description: &str, companies: &'a [String]) -> Option<&'a str> {
    if description.is_empty() {
        return None;
    }
    let haystack = description.to_lowercase();

    companies
        .iter()
        .map(String::as_str)
        .find(|company| name_variants(company).iter().any(|v| haystack.contains(v.as_str())))
}

/// Lowercased name plus its punctuation-normalized spellings.
fn name_variants(company: &str) -> Vec<String> {
    let lower = company.trim().to_lowercase();
    if lower.is_empty() {
        return Vec::new();
    }

    let spaced = lower.replace(['.', '-', '_'], " ");
    let dotless = lower.replace('.', "").replace(['-', '_'], " ");

    let mut variants = vec![lower];
    for v in [spaced, dotless] {
        let v = v.trim().to_string();
        if !v.is_empty() && !variants.contains(&v) {
            variants.push(v);
        }
    }
    variants
}
