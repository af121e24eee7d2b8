use std::fmt;

use serde::Serialize;

/// Descriptive rating for a mean on the five-point scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RatingLabel {
    Outstanding,
    VerySatisfactory,
    Satisfactory,
    Unsatisfactory,
    Poor,
    NoData,
}

impl RatingLabel {
    /// Breakpoints are inclusive at the lower end: 4.50 is Outstanding,
    /// 4.49 Very Satisfactory. A mean of 0 means nothing was rated.
    pub fn classify(rating: f64) -> RatingLabel {
        if !rating.is_finite() || rating == 0.0 {
            RatingLabel::NoData
        } else if rating >= 4.5 {
            RatingLabel::Outstanding
        } else if rating >= 3.5 {
            RatingLabel::VerySatisfactory
        } else if rating >= 2.5 {
            RatingLabel::Satisfactory
        } else if rating >= 1.5 {
            RatingLabel::Unsatisfactory
        } else {
            RatingLabel::Poor
        }
    }

    /// Label for a single answer on the scale.
    pub fn from_score(score: u8) -> Option<RatingLabel> {
        match score {
            5 => Some(RatingLabel::Outstanding),
            4 => Some(RatingLabel::VerySatisfactory),
            3 => Some(RatingLabel::Satisfactory),
            2 => Some(RatingLabel::Unsatisfactory),
            1 => Some(RatingLabel::Poor),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RatingLabel::Outstanding => "Outstanding",
            RatingLabel::VerySatisfactory => "Very Satisfactory",
            RatingLabel::Satisfactory => "Satisfactory",
            RatingLabel::Unsatisfactory => "Unsatisfactory",
            RatingLabel::Poor => "Poor",
            RatingLabel::NoData => "No Data",
        }
    }
}

impl fmt::Display for RatingLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
