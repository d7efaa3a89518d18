//! Deterministic applicant names, employers and banks from curated lists.
//!
//! All generation is deterministic (same RNG seed = same names).

use crate::rng::SeededRng;

pub struct NameGenerator;

impl NameGenerator {
    /// First name for the given gender code ("M" or "F").
    pub fn first_name(rng: &mut SeededRng, gender: &str) -> &'static str {
        if gender == "F" {
            *rng.pick(FEMALE_FIRST_NAMES)
        } else {
            *rng.pick(MALE_FIRST_NAMES)
        }
    }

    pub fn last_name(rng: &mut SeededRng) -> &'static str {
        *rng.pick(LAST_NAMES)
    }

    pub fn employer(rng: &mut SeededRng) -> &'static str {
        *rng.pick(EMPLOYERS)
    }

    /// Bank name and the four-letter IFSC prefix it issues under.
    pub fn bank(rng: &mut SeededRng) -> (&'static str, &'static str) {
        *rng.pick(BANKS)
    }

    pub fn email_domain(rng: &mut SeededRng) -> &'static str {
        *rng.pick(EMAIL_DOMAINS)
    }

    pub fn court(rng: &mut SeededRng) -> &'static str {
        *rng.pick(COURTS)
    }

    pub fn lender(rng: &mut SeededRng) -> &'static str {
        *rng.pick(LENDERS)
    }
}

const MALE_FIRST_NAMES: &[&str] = &[
    "Aarav", "Vivaan", "Aditya", "Vihaan", "Arjun", "Sai", "Reyansh", "Ayaan",
    "Krishna", "Ishaan", "Rohan", "Rahul", "Amit", "Suresh", "Rajesh", "Vikram",
    "Anil", "Sanjay", "Manoj", "Deepak", "Karthik", "Naveen", "Pradeep", "Harish",
    "Imran", "Farhan", "Gurpreet", "Harjeet", "Joseph", "Thomas",
];

const FEMALE_FIRST_NAMES: &[&str] = &[
    "Aadhya", "Ananya", "Diya", "Saanvi", "Pari", "Anika", "Navya", "Myra",
    "Priya", "Pooja", "Neha", "Kavya", "Sneha", "Lakshmi", "Meera", "Divya",
    "Anjali", "Sunita", "Rekha", "Shalini", "Deepa", "Nandini", "Swati", "Aisha",
    "Fatima", "Simran", "Harleen", "Mary", "Teresa", "Shreya",
];

const LAST_NAMES: &[&str] = &[
    "Sharma", "Verma", "Gupta", "Singh", "Kumar", "Patel", "Shah", "Mehta",
    "Reddy", "Rao", "Naidu", "Iyer", "Iyengar", "Nair", "Menon", "Pillai",
    "Das", "Ghosh", "Banerjee", "Chatterjee", "Mukherjee", "Bose", "Joshi", "Kulkarni",
    "Deshpande", "Patil", "Jadhav", "Khan", "Qureshi", "Sheikh", "Gill", "Sandhu",
    "Fernandes", "D'Souza", "Pereira", "Agarwal", "Bansal", "Mishra", "Tiwari", "Pandey",
];

const EMPLOYERS: &[&str] = &[
    "Tata Consultancy Services", "Infosys Limited", "Wipro Technologies",
    "HCL Technologies", "Larsen & Toubro", "Reliance Industries",
    "Mahindra & Mahindra", "Bharat Petroleum Corporation", "State Bank of India",
    "Indian Railways", "Apollo Hospitals", "Asian Paints", "Hindustan Unilever",
    "Bajaj Auto", "Sun Pharmaceutical Industries", "Maruti Suzuki India",
];

const BANKS: &[(&str, &str)] = &[
    ("State Bank of India", "SBIN"),
    ("HDFC Bank", "HDFC"),
    ("ICICI Bank", "ICIC"),
    ("Axis Bank", "UTIB"),
    ("Punjab National Bank", "PUNB"),
    ("Bank of Baroda", "BARB"),
    ("Canara Bank", "CNRB"),
    ("Kotak Mahindra Bank", "KKBK"),
];

const EMAIL_DOMAINS: &[&str] = &["gmail.com", "yahoo.co.in", "outlook.com", "rediffmail.com"];

const COURTS: &[&str] = &[
    "Delhi High Court",
    "Bombay High Court",
    "Madras High Court",
    "Calcutta High Court",
    "Karnataka High Court",
    "Chief Metropolitan Magistrate, Mumbai",
];

const LENDERS: &[&str] = &[
    "HDFC Bank", "ICICI Bank", "Bajaj Finance", "Muthoot Finance",
    "Tata Capital", "State Bank of India", "Axis Bank", "IDFC First Bank",
];
