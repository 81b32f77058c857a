/// Codelist domain of academic title prefixes (e.g. "Ing.").
pub const DOMAIN_TITLE_PREFIX: &str = "TITUL_PRED";

/// Codelist domain of academic title suffixes (e.g. "Ph.D.").
pub const DOMAIN_TITLE_SUFFIX: &str = "TITUL_ZA";

pub const DOMAIN_GENDER: &str = "POHLAVI";

pub const DOMAIN_MARITAL_STATUS: &str = "STAV";

pub const DOMAIN_CITIZENSHIP_QUALIFIER: &str = "KVANT_OBCAN";

/// Countries by numeric id; used for citizenship, birth place, addresses and schools.
pub const DOMAIN_COUNTRY: &str = "STAT";

pub const DOMAIN_MUNICIPALITY: &str = "OBEC";

pub const DOMAIN_MUNICIPALITY_PART: &str = "CAST_OBCE";

pub const DOMAIN_DISTRICT: &str = "OKRES";

/// Czech bank codes.
pub const DOMAIN_BANK: &str = "CIS_BANK";

/// Bank codes of euro accounts.
pub const DOMAIN_BANK_EURO: &str = "CIS_BANK_EURO";

/// Form of study (full-time, combined, ...).
pub const DOMAIN_STUDY_FORM: &str = "FORMA_OBORU_NEW";

pub const DOMAIN_STUDY_TYPE: &str = "TYP_OBORU";

/// Downstream name of the local person store.
pub const LOCAL_STORE_DOWNSTREAM: &str = "local-store";
