//! Closed choice enumerations used by case fields.
//!
//! Every choice serialises as its stored code, renders with a human label and
//! round-trips through a PostgreSQL `TEXT` column. Unknown codes are rejected
//! both when parsing form input and when decoding a row.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{
    encode::IsNull,
    error::BoxDynError,
    postgres::{PgArgumentBuffer, PgTypeInfo, PgValueRef},
    Decode, Encode, Postgres, Type,
};
use std::fmt;
use std::str::FromStr;

/// A code that does not belong to the choice list it was parsed against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChoice {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not a valid {}", self.value, self.kind)
    }
}

impl std::error::Error for UnknownChoice {}

/// One entry of a choice list as presented on a form screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChoiceOption {
    pub code: &'static str,
    pub label: &'static str,
}

/// Shared surface of every choice enumeration.
pub trait Choice: FromStr<Err = UnknownChoice> + Copy + 'static {
    fn code(self) -> &'static str;
    fn label(self) -> &'static str;
    fn options() -> Vec<ChoiceOption>;
}

macro_rules! choice_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => ($code:literal, $label:literal)),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl Choice for $name {
            fn code(self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            fn options() -> Vec<ChoiceOption> {
                $name::ALL
                    .iter()
                    .map(|c| ChoiceOption {
                        code: c.code(),
                        label: c.label(),
                    })
                    .collect()
            }
        }

        impl FromStr for $name {
            type Err = UnknownChoice;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err(UnknownChoice {
                        kind: stringify!($name),
                        value: other.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.code())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let code = String::deserialize(deserializer)?;
                code.parse().map_err(serde::de::Error::custom)
            }
        }

        impl Type<Postgres> for $name {
            fn type_info() -> PgTypeInfo {
                <String as Type<Postgres>>::type_info()
            }

            fn compatible(ty: &PgTypeInfo) -> bool {
                <String as Type<Postgres>>::compatible(ty)
            }
        }

        impl Encode<'_, Postgres> for $name {
            fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
                <&str as Encode<Postgres>>::encode_by_ref(&self.code(), buf)
            }
        }

        impl<'r> Decode<'r, Postgres> for $name {
            fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
                let code = <&str as Decode<Postgres>>::decode(value)?;
                Ok(code.parse::<$name>()?)
            }
        }
    };
}

choice_enum! {
    /// How an enquiry arrived or how the response is sent.
    CorrespondenceMethod {
        Email => ("EMAIL", "Email"),
        Letter => ("LETTER", "Letter"),
        Phone => ("PHONE", "Phone"),
        Fax => ("FAX", "Fax"),
    }
}

choice_enum! {
    /// Ground on which a third party must be consulted.
    ThirdPartyConsultationReason {
        PersonBusiness => ("PERSON_BUSINESS", "a person's business or professional affairs"),
        OrganisationBusiness => (
            "ORGANISATION_BUSINESS",
            "an organisation's business or professional affairs"
        ),
        PersonPersonal => ("PERSON_PERSONAL", "an individual's personal information"),
        Government => (
            "GOVERNMENT",
            "material originating or received from a State or Territory government"
        ),
        Foreign => ("FOREIGN", "material originating or received from a foreign entity"),
    }
}

choice_enum! {
    DocumentDisposition {
        Attached => ("ATTACHED", "Attached"),
        Described => ("DESCRIBED", "Described"),
    }
}

choice_enum! {
    /// Decision reached on an FOI request.
    FoiOutcome {
        FullAccess => ("FULL_ACCESS", "1) Grant access in full"),
        PartialExemption => ("PARTIAL_EXEMPTION", "2) Withhold some documents as exempt"),
        FullExemption => ("FULL_EXEMPTION", "3) Withhold all documents as exempt"),
        Defer => ("DEFER", "4) Defer access"),
        Redaction => ("REDACTION", "5) Grant access with redactions"),
        DocumentsDoNotExist => ("DNE", "6) Documents do not exist or cannot be found"),
        NeitherConfirmNorDeny => ("NCND", "7) Neither confirm nor deny"),
    }
}

choice_enum! {
    /// Exemption category. Used for both outright and conditional exemptions.
    Exemption {
        CommonwealthStateRelations => ("CSR", "Commonwealth-State Relations"),
        DeliberativeProcesses => (
            "DPRAMF",
            "Deliberative Processes Relating to Agencies' or Ministers' Functions"
        ),
        FinancialPropertyInterests => ("FPIC", "Financial and Property Interests of the Commonwealth"),
        OperationsOfAgencies => ("OAM", "Operations of Agencies Management"),
        PersonalPrivacy => ("PP", "Personal Privacy"),
        BusinessAffairs => ("BA", "Business Affairs"),
        Research => ("RCANU", "Research by CSIRO or the Australian National University"),
        Economy => ("AE", "Australia's Economy"),
    }
}

choice_enum! {
    DisclosureOutcome {
        GrantedInFull => ("GRANTED_IN_FULL", "Granted In Full"),
        WithheldInPart => ("WITHHELD_IN_PART", "Withheld In Part"),
        WithheldInFull => ("WITHHELD_IN_FULL", "Withheld In Full"),
    }
}

choice_enum! {
    /// Conclusive certificate issued over the documents. Codes double as labels.
    Certificate {
        NationalSecurity => ("National Security", "National Security"),
        Defence => ("Defence", "Defence"),
        InternationalRelations => ("International Relations", "International Relations"),
        RelationsWithStates => ("Relations with States", "Relations with States"),
        CabinetDocuments => ("Cabinet Documents", "Cabinet Documents"),
        ExecutiveCouncilDocuments => ("Executive Council Documents", "Executive Council Documents"),
        InternalWorkingDocuments => ("Internal Working Documents", "Internal Working Documents"),
    }
}
