pub mod calendar;
pub mod period;
pub mod work_item;
