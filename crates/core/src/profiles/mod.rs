//! Profiles module - fragment models, assembled profiles and source ports.

mod profiles_constants;
mod profiles_model;
mod profiles_traits;

pub use profiles_constants::*;
pub use profiles_model::{
    Address, Addresses, BankAccount, Banking, BirthPlace, Citizenship, CompositeProfile, Contact,
    Education, FragmentKind, PersonalInfo, ProfileId, RawAddress, RawAddresses, RawBankAccount,
    RawBanking, RawEducation, RawFragment, RawProfileCore, RawStudentIds, RawStudyProgram,
    SimpleProfile, StudyProgram, Titles,
};
pub use profiles_traits::{LocalStore, RemoteProfileSource};
