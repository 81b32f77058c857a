//! Profile domain models: raw fragments as fetched and the assembled profiles.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::profiles_constants::*;
use crate::codelist::{CodeKey, ResolvedMeanings};
use crate::errors::{Error, FieldViolation, Result};
use crate::language::Language;

/// Positive person number identifying the profile owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileId(u32);

impl ProfileId {
    pub fn new(id: u32) -> Result<Self> {
        if id == 0 {
            return Err(Error::Validation(vec![FieldViolation::new(
                "personId",
                "must be a positive number",
            )]));
        }
        Ok(Self(id))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl FromStr for ProfileId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id = s.trim().parse::<u32>().map_err(|_| {
            Error::Validation(vec![FieldViolation::new(
                "personId",
                format!("'{}' is not a valid person number", s),
            )])
        })?;
        Self::new(id)
    }
}

impl fmt::Display for ProfileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The independently fetchable parts of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FragmentKind {
    Core,
    Addresses,
    Banking,
    Education,
    StudyProgram,
    StudentIds,
}

impl FragmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Addresses => "addresses",
            Self::Banking => "banking",
            Self::Education => "education",
            Self::StudyProgram => "study-program",
            Self::StudentIds => "student-ids",
        }
    }
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn push_key(keys: &mut Vec<CodeKey>, domain: &str, code: Option<&String>) {
    if let Some(code) = code {
        keys.push(CodeKey::new(domain, code.as_str()));
    }
}

// =============================================================================
// Raw fragments
// =============================================================================

/// Personal data read from the local person store. Coded fields hold raw codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfileCore {
    pub first_name: String,
    pub last_name: String,
    pub birth_surname: Option<String>,
    pub title_prefix: Option<String>,
    pub title_suffix: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub birth_place: Option<String>,
    pub birth_country: Option<String>,
    pub citizenship_country: Option<String>,
    pub citizenship_qualifier: Option<String>,
    pub contact: Contact,
}

impl RawProfileCore {
    pub fn code_keys(&self) -> Vec<CodeKey> {
        let mut keys = self.simple_code_keys();
        push_key(&mut keys, DOMAIN_MARITAL_STATUS, self.marital_status.as_ref());
        push_key(&mut keys, DOMAIN_COUNTRY, self.birth_country.as_ref());
        push_key(&mut keys, DOMAIN_COUNTRY, self.citizenship_country.as_ref());
        push_key(
            &mut keys,
            DOMAIN_CITIZENSHIP_QUALIFIER,
            self.citizenship_qualifier.as_ref(),
        );
        keys
    }

    /// Codes needed by the simple profile: titles and gender.
    pub fn simple_code_keys(&self) -> Vec<CodeKey> {
        let mut keys = Vec::new();
        push_key(&mut keys, DOMAIN_TITLE_PREFIX, self.title_prefix.as_ref());
        push_key(&mut keys, DOMAIN_TITLE_SUFFIX, self.title_suffix.as_ref());
        push_key(&mut keys, DOMAIN_GENDER, self.gender.as_ref());
        keys
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
}

/// Czech address as stored: the place names are codes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddress {
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub zip_code: Option<String>,
    pub municipality: Option<String>,
    pub municipality_part: Option<String>,
    pub district: Option<String>,
    pub country: Option<String>,
}

impl RawAddress {
    fn push_code_keys(&self, keys: &mut Vec<CodeKey>) {
        push_key(keys, DOMAIN_MUNICIPALITY, self.municipality.as_ref());
        push_key(keys, DOMAIN_MUNICIPALITY_PART, self.municipality_part.as_ref());
        push_key(keys, DOMAIN_DISTRICT, self.district.as_ref());
        push_key(keys, DOMAIN_COUNTRY, self.country.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAddresses {
    pub permanent: Option<RawAddress>,
    pub temporary: Option<RawAddress>,
}

impl RawAddresses {
    pub fn code_keys(&self) -> Vec<CodeKey> {
        let mut keys = Vec::new();
        for address in [&self.permanent, &self.temporary].into_iter().flatten() {
            address.push_code_keys(&mut keys);
        }
        keys
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBankAccount {
    pub holder: Option<String>,
    pub prefix: Option<String>,
    pub number: Option<String>,
    pub bank_code: Option<String>,
    pub iban: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBanking {
    pub account: Option<RawBankAccount>,
    pub euro_account: Option<RawBankAccount>,
}

impl RawBanking {
    pub fn code_keys(&self) -> Vec<CodeKey> {
        let mut keys = Vec::new();
        if let Some(account) = &self.account {
            push_key(&mut keys, DOMAIN_BANK, account.bank_code.as_ref());
        }
        if let Some(account) = &self.euro_account {
            push_key(&mut keys, DOMAIN_BANK_EURO, account.bank_code.as_ref());
        }
        keys
    }
}

/// Prior education. The school's country is a code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEducation {
    pub high_school: Option<String>,
    pub high_school_field: Option<String>,
    pub high_school_country: Option<String>,
    pub graduation_year: Option<u16>,
}

impl RawEducation {
    pub fn code_keys(&self) -> Vec<CodeKey> {
        let mut keys = Vec::new();
        push_key(&mut keys, DOMAIN_COUNTRY, self.high_school_country.as_ref());
        keys
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStudyProgram {
    pub student_id: String,
    pub program_code: String,
    pub program_name: String,
    pub faculty: Option<String>,
    pub study_form: Option<String>,
    pub study_type: Option<String>,
}

impl RawStudyProgram {
    pub fn code_keys(&self) -> Vec<CodeKey> {
        let mut keys = Vec::new();
        push_key(&mut keys, DOMAIN_STUDY_FORM, self.study_form.as_ref());
        push_key(&mut keys, DOMAIN_STUDY_TYPE, self.study_type.as_ref());
        keys
    }
}

/// Student numbers the person holds, one per study.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStudentIds {
    pub student_ids: Vec<String>,
}

/// One source's contribution to a profile, before code resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RawFragment {
    Core(RawProfileCore),
    Addresses(RawAddresses),
    Banking(RawBanking),
    Education(RawEducation),
    StudyProgram(RawStudyProgram),
    StudentIds(RawStudentIds),
}

impl RawFragment {
    pub fn kind(&self) -> FragmentKind {
        match self {
            Self::Core(_) => FragmentKind::Core,
            Self::Addresses(_) => FragmentKind::Addresses,
            Self::Banking(_) => FragmentKind::Banking,
            Self::Education(_) => FragmentKind::Education,
            Self::StudyProgram(_) => FragmentKind::StudyProgram,
            Self::StudentIds(_) => FragmentKind::StudentIds,
        }
    }

    /// Every coded value inside the fragment. Empty when nothing needs resolving.
    pub fn code_keys(&self) -> Vec<CodeKey> {
        match self {
            Self::Core(core) => core.code_keys(),
            Self::Addresses(addresses) => addresses.code_keys(),
            Self::Banking(banking) => banking.code_keys(),
            Self::Education(education) => education.code_keys(),
            Self::StudyProgram(program) => program.code_keys(),
            Self::StudentIds(_) => Vec::new(),
        }
    }
}

// =============================================================================
// Assembled profiles
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Titles {
    pub prefix: Option<String>,
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Citizenship {
    pub country: Option<String>,
    pub qualifier: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthPlace {
    pub city: Option<String>,
    pub country: Option<String>,
}

/// Personal data with every code replaced by its meaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    pub birth_surname: Option<String>,
    pub titles: Titles,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub birth_place: BirthPlace,
    pub citizenship: Citizenship,
    pub contact: Contact,
}

impl PersonalInfo {
    pub fn resolve(raw: RawProfileCore, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            titles: resolve_titles(&raw, meanings)?,
            gender: meanings.lookup(DOMAIN_GENDER, raw.gender.as_deref())?,
            marital_status: meanings.lookup(DOMAIN_MARITAL_STATUS, raw.marital_status.as_deref())?,
            birth_place: BirthPlace {
                country: meanings.lookup(DOMAIN_COUNTRY, raw.birth_country.as_deref())?,
                city: raw.birth_place,
            },
            citizenship: Citizenship {
                country: meanings.lookup(DOMAIN_COUNTRY, raw.citizenship_country.as_deref())?,
                qualifier: meanings.lookup(
                    DOMAIN_CITIZENSHIP_QUALIFIER,
                    raw.citizenship_qualifier.as_deref(),
                )?,
            },
            first_name: raw.first_name,
            last_name: raw.last_name,
            birth_surname: raw.birth_surname,
            contact: raw.contact,
        })
    }
}

fn resolve_titles(raw: &RawProfileCore, meanings: &ResolvedMeanings) -> Result<Titles> {
    Ok(Titles {
        prefix: meanings.lookup(DOMAIN_TITLE_PREFIX, raw.title_prefix.as_deref())?,
        suffix: meanings.lookup(DOMAIN_TITLE_SUFFIX, raw.title_suffix.as_deref())?,
    })
}

/// Address with place names in the requested language.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: Option<String>,
    pub street_number: Option<String>,
    pub zip_code: Option<String>,
    pub municipality: Option<String>,
    pub municipality_part: Option<String>,
    pub district: Option<String>,
    pub country: Option<String>,
}

impl Address {
    fn resolve(raw: RawAddress, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            municipality: meanings.lookup(DOMAIN_MUNICIPALITY, raw.municipality.as_deref())?,
            municipality_part: meanings
                .lookup(DOMAIN_MUNICIPALITY_PART, raw.municipality_part.as_deref())?,
            district: meanings.lookup(DOMAIN_DISTRICT, raw.district.as_deref())?,
            country: meanings.lookup(DOMAIN_COUNTRY, raw.country.as_deref())?,
            street: raw.street,
            street_number: raw.street_number,
            zip_code: raw.zip_code,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Addresses {
    pub permanent: Option<Address>,
    pub temporary: Option<Address>,
}

impl Addresses {
    pub fn resolve(raw: RawAddresses, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            permanent: raw
                .permanent
                .map(|address| Address::resolve(address, meanings))
                .transpose()?,
            temporary: raw
                .temporary
                .map(|address| Address::resolve(address, meanings))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Education {
    pub high_school: Option<String>,
    pub high_school_field: Option<String>,
    pub high_school_country: Option<String>,
    pub graduation_year: Option<u16>,
}

impl Education {
    pub fn resolve(raw: RawEducation, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            high_school_country: meanings
                .lookup(DOMAIN_COUNTRY, raw.high_school_country.as_deref())?,
            high_school: raw.high_school,
            high_school_field: raw.high_school_field,
            graduation_year: raw.graduation_year,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub holder: Option<String>,
    pub prefix: Option<String>,
    pub number: Option<String>,
    pub bank_code: Option<String>,
    pub bank_name: Option<String>,
    pub iban: Option<String>,
    pub currency: Option<String>,
}

impl BankAccount {
    fn resolve(raw: RawBankAccount, domain: &str, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            bank_name: meanings.lookup(domain, raw.bank_code.as_deref())?,
            holder: raw.holder,
            prefix: raw.prefix,
            number: raw.number,
            bank_code: raw.bank_code,
            iban: raw.iban,
            currency: raw.currency,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Banking {
    pub account: Option<BankAccount>,
    pub euro_account: Option<BankAccount>,
}

impl Banking {
    pub fn resolve(raw: RawBanking, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            account: raw
                .account
                .map(|account| BankAccount::resolve(account, DOMAIN_BANK, meanings))
                .transpose()?,
            euro_account: raw
                .euro_account
                .map(|account| BankAccount::resolve(account, DOMAIN_BANK_EURO, meanings))
                .transpose()?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProgram {
    pub student_id: String,
    pub code: String,
    pub name: String,
    pub faculty: Option<String>,
    pub form: Option<String>,
    #[serde(rename = "type")]
    pub study_type: Option<String>,
}

impl StudyProgram {
    pub fn resolve(raw: RawStudyProgram, meanings: &ResolvedMeanings) -> Result<Self> {
        Ok(Self {
            form: meanings.lookup(DOMAIN_STUDY_FORM, raw.study_form.as_deref())?,
            study_type: meanings.lookup(DOMAIN_STUDY_TYPE, raw.study_type.as_deref())?,
            student_id: raw.student_id,
            code: raw.program_code,
            name: raw.program_name,
            faculty: raw.faculty,
        })
    }
}

/// Cross-source profile, built fresh for one request.
///
/// Only ever handed out complete: optional sections are `None` because their
/// source reported no data, never because a fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositeProfile {
    pub person_id: ProfileId,
    pub language: Language,
    pub personal: PersonalInfo,
    /// Empty when the person never studied or no student source is registered.
    pub student_ids: Vec<String>,
    pub addresses: Option<Addresses>,
    pub banking: Option<Banking>,
    pub education: Option<Education>,
    pub study_program: Option<StudyProgram>,
}

impl CompositeProfile {
    /// Start from the resolved personal data; remote sections are added afterwards.
    pub fn new(person_id: ProfileId, language: Language, personal: PersonalInfo) -> Self {
        Self {
            person_id,
            language,
            personal,
            student_ids: Vec::new(),
            addresses: None,
            banking: None,
            education: None,
            study_program: None,
        }
    }

    /// Resolve a remote fragment and attach it to its section.
    pub fn attach(&mut self, fragment: RawFragment, meanings: &ResolvedMeanings) -> Result<()> {
        match fragment {
            RawFragment::Core(_) => {
                return Err(Error::Internal(
                    "core fragment delivered by a remote source".to_string(),
                ))
            }
            RawFragment::Addresses(addresses) => {
                self.addresses = Some(Addresses::resolve(addresses, meanings)?)
            }
            RawFragment::Banking(banking) => self.banking = Some(Banking::resolve(banking, meanings)?),
            RawFragment::Education(education) => {
                self.education = Some(Education::resolve(education, meanings)?)
            }
            RawFragment::StudyProgram(program) => {
                self.study_program = Some(StudyProgram::resolve(program, meanings)?)
            }
            RawFragment::StudentIds(ids) => self.student_ids = ids.student_ids,
        }
        Ok(())
    }
}

/// Reduced profile: names, titles and gender only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleProfile {
    pub person_id: ProfileId,
    pub first_name: String,
    pub last_name: String,
    pub titles: Titles,
    pub gender: Option<String>,
}

impl SimpleProfile {
    pub fn resolve(
        person_id: ProfileId,
        raw: RawProfileCore,
        meanings: &ResolvedMeanings,
    ) -> Result<Self> {
        Ok(Self {
            person_id,
            titles: resolve_titles(&raw, meanings)?,
            gender: meanings.lookup(DOMAIN_GENDER, raw.gender.as_deref())?,
            first_name: raw.first_name,
            last_name: raw.last_name,
        })
    }
}
