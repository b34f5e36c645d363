pub mod remove_duplicate_sys_category_record_mms;

pub use remove_duplicate_sys_category_record_mms::RemoveDuplicateSysCategoryRecordMms;
