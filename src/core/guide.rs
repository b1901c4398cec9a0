//! Suggested hourly rates for common habits, and a yearly value calculator.
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Average number of weeks in a month.
const WEEKS_PER_MONTH: Decimal = dec!(4.33);
const WEEKS_PER_YEAR: Decimal = dec!(52);

#[derive(Debug, Clone, Copy)]
pub struct SuggestedHabit {
    pub name: &'static str,
    pub rate: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct HabitFamily {
    pub title: &'static str,
    pub habits: &'static [SuggestedHabit],
}

const fn habit(name: &'static str, rate: i32) -> SuggestedHabit {
    SuggestedHabit { name, rate }
}

pub const HABIT_FAMILIES: &[HabitFamily] = &[
    HabitFamily {
        title: "Professional Development",
        habits: &[
            habit("Learning new skills", 50),
            habit("Reading industry books", 40),
            habit("Taking online courses", 45),
            habit("Attending conferences", 60),
            habit("Networking events", 35),
            habit("Mentoring others", 30),
            habit("Writing articles/blog posts", 25),
            habit("Building side projects", 40),
        ],
    },
    HabitFamily {
        title: "Health & Fitness",
        habits: &[
            habit("Exercise/Gym", 30),
            habit("Running/Jogging", 25),
            habit("Yoga/Meditation", 20),
            habit("Swimming", 25),
            habit("Cycling", 20),
            habit("Hiking", 15),
            habit("Team sports", 20),
            habit("Martial arts", 25),
            habit("Dancing", 15),
        ],
    },
    HabitFamily {
        title: "Personal Growth",
        habits: &[
            habit("Reading books", 20),
            habit("Journaling", 15),
            habit("Learning languages", 25),
            habit("Playing musical instruments", 20),
            habit("Art/Creative projects", 15),
            habit("Volunteering", 10),
            habit("Travel/Exploration", 15),
            habit("Cooking new recipes", 10),
        ],
    },
    HabitFamily {
        title: "Time Wasters",
        habits: &[
            habit("Social media scrolling", -15),
            habit("Watching TV/movies", -10),
            habit("Gaming", -20),
            habit("Online shopping", -25),
            habit("Gossiping", -5),
            habit("Procrastination", -30),
            habit("Excessive news consumption", -10),
            habit("Mindless web browsing", -15),
        ],
    },
    HabitFamily {
        title: "Life Management",
        habits: &[
            habit("Cleaning/organizing", 15),
            habit("Meal prep", 20),
            habit("Garden maintenance", 10),
            habit("Home repairs", 25),
            habit("Financial planning", 40),
            habit("Family time", 30),
            habit("Pet care", 15),
            habit("Errands/shopping", 10),
        ],
    },
];

/// Rules of thumb for picking a rate.
pub const POSITIVE_VALUE_HINTS: &[&str] = &[
    "Professional value: how much would you pay someone to do this?",
    "Future earnings: skills that increase your earning potential",
    "Health savings: activities that prevent future medical costs",
    "Time saved: habits that free up time later",
    "Quality of life: activities that improve your well-being",
];

pub const NEGATIVE_VALUE_HINTS: &[&str] = &[
    "Opportunity cost: what else could you be doing?",
    "Health costs: activities that harm your health",
    "Financial impact: habits that cost money directly",
    "Productivity loss: time that could be spent earning",
    "Stress: activities that increase negative emotions",
];

#[derive(Debug, Clone, PartialEq)]
pub struct HabitProjection {
    pub weekly: Decimal,
    pub monthly: Decimal,
    pub yearly: Decimal,
}

impl HabitProjection {
    pub fn from_weekly_hours(hours_per_week: Decimal, rate: Decimal) -> Self {
        let weekly = hours_per_week.saturating_mul(rate);
        Self {
            weekly,
            monthly: weekly.saturating_mul(WEEKS_PER_MONTH),
            yearly: weekly.saturating_mul(WEEKS_PER_YEAR),
        }
    }
}

/// Looks up a suggested habit by name, ignoring case.
pub fn suggestion(name: &str) -> Option<&'static SuggestedHabit> {
    let wanted = name.trim().to_lowercase();
    HABIT_FAMILIES
        .iter()
        .flat_map(|family| family.habits.iter())
        .find(|h| h.name.to_lowercase() == wanted)
}
