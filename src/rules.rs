use crate::categorizer::MatchType::{Contains as C, Word as W};
use crate::categorizer::{CategoryRule, MatchType};

type Seed = (&'static str, MatchType, Option<&'static str>);

const DINING: &[Seed] = &[
    ("restaurant", C, None),
    ("dining", C, None),
    ("café", C, None),
    ("cafe", C, None),
    ("coffee", C, None),
    ("bakery", C, None),
    ("starbucks", C, Some("Starbucks")),
    ("dunkin", C, Some("Dunkin'")),
    ("mcdonald", C, Some("McDonald's")),
    ("burger", C, None),
    ("pizza", C, None),
    ("taco", C, None),
    ("chipotle", C, Some("Chipotle")),
    ("wendy", C, Some("Wendy's")),
    ("subway", C, Some("Subway")),
    ("grubhub", C, Some("Grubhub")),
    ("doordash", C, Some("DoorDash")),
    ("ubereats", C, Some("Uber Eats")),
    ("uber eats", C, Some("Uber Eats")),
    ("deli", W, None),
    ("bar & grill", C, None),
    ("bistro", C, None),
    ("steakhouse", C, None),
    ("sushi", C, None),
];

const GROCERIES: &[Seed] = &[
    ("grocery", C, None),
    ("supermarket", C, None),
    ("market", C, None),
    ("whole foods", C, Some("Whole Foods")),
    ("wholefds", C, Some("Whole Foods")),
    ("kroger", C, Some("Kroger")),
    ("safeway", C, Some("Safeway")),
    ("trader joe", C, Some("Trader Joe's")),
    ("aldi", W, Some("Aldi")),
    ("walmart", C, Some("Walmart")),
    ("wal-mart", C, Some("Walmart")),
    ("target", C, Some("Target")),
    ("costco", C, Some("Costco")),
    ("sam's club", C, Some("Sam's Club")),
    ("publix", C, Some("Publix")),
    ("wegmans", C, Some("Wegmans")),
    ("instacart", C, Some("Instacart")),
];

const GAS_AUTOMOTIVE: &[Seed] = &[
    ("gas", W, None),
    ("fuel", C, None),
    ("shell", C, Some("Shell")),
    ("exxon", C, Some("Exxon")),
    ("mobil", W, Some("Mobil")),
    ("chevron", C, Some("Chevron")),
    ("bp", W, Some("BP")),
    ("auto parts", C, None),
    ("autozone", C, Some("AutoZone")),
    ("jiffy lube", C, Some("Jiffy Lube")),
    ("meineke", C, Some("Meineke")),
    ("valvoline", C, Some("Valvoline")),
    ("car wash", C, None),
    ("parking", C, None),
    ("garage", C, None),
    ("toll", W, None),
];

const TRAVEL: &[Seed] = &[
    ("airline", C, None),
    ("flight", C, None),
    ("delta", W, Some("Delta")),
    ("united", W, Some("United")),
    ("american air", C, Some("American Airlines")),
    ("southwest", C, Some("Southwest")),
    ("jetblue", C, Some("JetBlue")),
    ("airbnb", C, Some("Airbnb")),
    ("hotel", C, None),
    ("motel", C, None),
    ("inn", W, None),
    ("resort", C, None),
    ("marriott", C, Some("Marriott")),
    ("hilton", C, Some("Hilton")),
    ("hyatt", C, Some("Hyatt")),
    ("expedia", C, Some("Expedia")),
    ("travelocity", C, Some("Travelocity")),
    ("booking.com", C, Some("Booking.com")),
    ("uber", W, Some("Uber")),
    ("lyft", C, Some("Lyft")),
    ("taxi", W, None),
    ("car rental", C, None),
    ("hertz", C, Some("Hertz")),
    ("avis", W, Some("Avis")),
    ("enterprise", W, Some("Enterprise")),
];

const ENTERTAINMENT: &[Seed] = &[
    ("movie", C, None),
    ("cinema", C, None),
    ("theater", C, None),
    ("theatre", C, None),
    ("netflix", C, Some("Netflix")),
    ("hulu", C, Some("Hulu")),
    ("disney+", C, Some("Disney+")),
    ("disney plus", C, Some("Disney+")),
    ("spotify", C, Some("Spotify")),
    ("apple music", C, Some("Apple Music")),
    ("concert", C, None),
    ("ticketmaster", C, Some("Ticketmaster")),
    ("amazon prime", C, Some("Amazon Prime")),
    ("hbo", W, Some("HBO")),
    ("youtube", C, Some("YouTube")),
    ("game", C, None),
    ("playstation", C, Some("PlayStation")),
    ("xbox", C, Some("Xbox")),
    ("theme park", C, None),
    ("museum", C, None),
    ("zoo", W, None),
    ("aquarium", C, None),
];

const SHOPPING: &[Seed] = &[
    ("amazon", C, Some("Amazon")),
    ("amzn", C, Some("Amazon")),
    ("best buy", C, Some("Best Buy")),
    ("macy", C, Some("Macy's")),
    ("nordstrom", C, Some("Nordstrom")),
    ("clothing", C, None),
    ("apparel", C, None),
    ("shoe", C, None),
    ("jewelry", C, None),
    ("accessory", C, None),
    ("cosmetic", C, None),
    ("sephora", C, Some("Sephora")),
    ("ulta", W, Some("Ulta Beauty")),
    ("mall", W, None),
    ("department store", C, None),
    ("nike", W, Some("Nike")),
    ("adidas", C, Some("Adidas")),
    ("apple store", C, Some("Apple Store")),
    ("microsoft", C, Some("Microsoft")),
    ("home depot", C, Some("The Home Depot")),
    ("lowe's", C, Some("Lowe's")),
    ("lowes", W, Some("Lowe's")),
    ("ikea", C, Some("IKEA")),
    ("furniture", C, None),
];

const HEALTH_MEDICAL: &[Seed] = &[
    ("pharmacy", C, None),
    ("drug store", C, None),
    ("cvs", W, Some("CVS")),
    ("walgreens", C, Some("Walgreens")),
    ("rite aid", C, Some("Rite Aid")),
    ("doctor", C, None),
    ("hospital", C, None),
    ("clinic", C, None),
    ("medical", C, None),
    ("dental", C, None),
    ("healthcare", C, None),
    ("insurance", C, None),
    ("vision", W, None),
    ("optometrist", C, None),
    ("chiropractor", C, None),
    ("therapy", C, None),
];

const UTILITIES_BILLS: &[Seed] = &[
    ("electric", C, None),
    ("water", C, None),
    ("gas bill", C, None),
    ("utility", C, None),
    ("utilities", C, None),
    ("phone", C, None),
    ("mobile", C, None),
    ("internet", C, None),
    ("cable", C, None),
    ("tv", W, None),
    ("telecom", C, None),
    ("at&t", C, Some("AT&T")),
    ("verizon", C, Some("Verizon")),
    ("comcast", C, Some("Comcast")),
    ("xfinity", C, Some("Xfinity")),
    ("spectrum", C, Some("Spectrum")),
    ("bill pay", C, None),
];

const SUBSCRIPTIONS: &[Seed] = &[
    ("subscription", C, None),
    ("membership", C, None),
    ("monthly", C, None),
    ("annual fee", C, None),
    ("gym", W, None),
    ("fitness", C, None),
    ("magazine", C, None),
    ("newspaper", C, None),
    ("software", C, None),
    ("service fee", C, None),
    ("recurring", C, None),
];

const EDUCATION: &[Seed] = &[
    ("tuition", C, None),
    ("school", C, None),
    ("university", C, None),
    ("college", C, None),
    ("campus", C, None),
    ("education", C, None),
    ("book store", C, None),
    ("bookstore", C, None),
    ("textbook", C, None),
    ("course", C, None),
    ("library", C, None),
    ("student", C, None),
];

const INCOME_TRANSFERS: &[Seed] = &[
    ("deposit", C, None),
    ("transfer", C, None),
    ("payment", C, None),
    ("payroll", C, None),
    ("venmo", C, Some("Venmo")),
    ("paypal", C, Some("PayPal")),
    ("zelle", C, Some("Zelle")),
    ("cash app", C, Some("Cash App")),
    ("refund", C, None),
    ("reimbursement", C, None),
];

/// Category names in tie-break order.
pub const BUILTIN_CATEGORIES: &[(&str, &[Seed])] = &[
    ("Dining", DINING),
    ("Groceries", GROCERIES),
    ("Gas & Automotive", GAS_AUTOMOTIVE),
    ("Travel", TRAVEL),
    ("Entertainment", ENTERTAINMENT),
    ("Shopping", SHOPPING),
    ("Health & Medical", HEALTH_MEDICAL),
    ("Utilities & Bills", UTILITIES_BILLS),
    ("Subscriptions & Memberships", SUBSCRIPTIONS),
    ("Education", EDUCATION),
    ("Income & Transfers", INCOME_TRANSFERS),
];

/// Short or ambiguous tokens match whole words only. A brand listed in two
/// categories appears once, under the category that should win.
pub fn builtin_rules() -> Vec<CategoryRule> {
    BUILTIN_CATEGORIES
        .iter()
        .flat_map(|(category, seeds)| {
            seeds.iter().map(move |(pattern, match_type, merchant)| {
                let rule = CategoryRule::new(pattern, *match_type, category);
                match merchant {
                    Some(name) => rule.merchant(name),
                    None => rule,
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::{Categorizer, RuleTable};

    fn classify(description: &str) -> (String, String) {
        let rules = RuleTable::builtin().unwrap();
        let c = Categorizer::new(&rules).classify(description);
        (c.category, c.merchant)
    }

    #[test]
    fn test_builtin_table_compiles() {
        let rules = RuleTable::builtin().unwrap();
        assert_eq!(rules.len(), builtin_rules().len());
        assert_eq!(BUILTIN_CATEGORIES.len(), 11);
    }

    #[test]
    fn test_known_merchants() {
        assert_eq!(classify("STARBUCKS STORE 1234"), ("Dining".into(), "Starbucks".into()));
        assert_eq!(classify("WHOLEFDS MKT 10234"), ("Groceries".into(), "Whole Foods".into()));
        assert_eq!(classify("UBER   TRIP HELP.UBER.COM"), ("Travel".into(), "Uber".into()));
        assert_eq!(classify("UBER EATS 8XK2"), ("Dining".into(), "Uber Eats".into()));
        assert_eq!(classify("NETFLIX.COM"), ("Entertainment".into(), "Netflix".into()));
        assert_eq!(classify("AMAZON PRIME*2K4"), ("Entertainment".into(), "Amazon Prime".into()));
        assert_eq!(classify("CVS 0421 BOSTON MA"), ("Health & Medical".into(), "CVS".into()));
    }

    #[test]
    fn test_word_patterns_do_not_fire_inside_words() {
        assert_eq!(classify("VEGAS SOUVENIRS").0, "Uncategorized");
        assert_eq!(classify("PAYMENT THANK YOU-MOBILE").0, "Income & Transfers");
        assert_eq!(classify("CORNER DELI").0, "Dining");
        assert_eq!(classify("DELIVERY FEE").0, "Uncategorized");
    }
}
