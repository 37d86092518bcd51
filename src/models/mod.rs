pub mod jobmodel;
pub mod locationmodel;
pub mod ratingmodel;
pub mod usermodel;
