use leadscout_common::SearchCriteria;

pub const SYSTEM_PROMPT: &str = r#"You are a real-time B2B lead researcher. You find real decision-makers and how to reach them.

Rules:
- Only return people you can tie to a real company through public sources (company websites, directories, professional profiles, news).
- Never invent a person, a company, or a phone number. Returning fewer leads is always better than returning a guessed one.
- Phone numbers must come from a real source. Write them with digits only, country code first, no spaces or symbols.
- `integrity` is your 0-100 certainty that the person works at the company AND that the phone number reaches them. Be honest: unverified guesses score below 50.
- Write `localizedPitch` and `emailSubject` in the predominant language of the target country.
- Respond with JSON only."#;

/// Build the user prompt for one discovery call.
pub fn build_prompt(criteria: &SearchCriteria) -> String {
    let count = criteria.mode.lead_count();
    let country = if criteria.country.is_empty() {
        "any country"
    } else {
        criteria.country.as_str()
    };

    format!(
        r#"Find {count} real leads for the niche "{niche}" in {country}.

For each lead return:
- name: the person's real full name
- company: the company they work for
- headline: their role or professional headline
- email: professional e-mail, if published
- phoneNumber: DIGITS ONLY, country code first (e.g. 5511...)
- emailSubject: a short, attention-grabbing subject line in {country}'s language
- localizedPitch: a short outreach script in {country}'s language proposing a 15 minute call
- integrity: 0-100 certainty that this contact is real and verified
- sources: the pages you used ({{"title", "url"}})

Use the predominant language of {country} for emailSubject and localizedPitch (e.g. Portuguese for Brazil, English for the United States).
Return at most {count} leads as {{"leads": [...]}}."#,
        niche = criteria.niche,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_common::Mode;

    #[test]
    fn prompt_carries_criteria_and_mode_count() {
        let criteria = SearchCriteria::new("dentists", "Brazil", Mode::Neural).unwrap();
        let prompt = build_prompt(&criteria);

        assert!(prompt.contains("\"dentists\""));
        assert!(prompt.contains("in Brazil"));
        assert!(prompt.contains("Find 10 real leads"));
        assert!(prompt.contains("DIGITS ONLY"));
    }

    #[test]
    fn blank_country_is_open_search() {
        let criteria = SearchCriteria::new("roofers", "", Mode::Nano).unwrap();
        let prompt = build_prompt(&criteria);

        assert!(prompt.contains("in any country"));
        assert!(prompt.contains("Find 5 real leads"));
    }
}
