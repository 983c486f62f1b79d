use std::fmt;
use std::fmt::{Display, Formatter};
use std::io;

/// Ways the engine can fail
///
/// Every variant is fatal for the whole compilation: the engine surfaces
/// the error to the caller and nothing is retried or recovered.
#[derive(Debug)]
pub enum Error {
    /// A type was interned after the scan phase closed
    LateRegistration { type_name: String },

    /// The classfile provider has no classfile for a name the hierarchy
    /// needs
    MissingClass { class_name: String },

    /// A type descriptor that is neither a recognized signature nor a bare
    /// class name
    BadSignature { signature: String },

    /// A used interface method with no concrete implementation reachable
    /// from a concrete class declaring the interface
    MissingImplementation {
        interface_method: String,
        class_name: String,
    },

    /// An array over a value type that has no component class
    UnsupportedArrayElement { element_type: String },

    /// The emission-order sweep stopped making progress
    CycleInHierarchy { remaining: Vec<String> },

    Io(io::Error),
}

impl Error {
    /// Source line of the offending construct; classfile metadata carries
    /// none here, so this is always −1 (unknown)
    pub fn line_number(&self) -> i32 {
        -1
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Error::LateRegistration { type_name } => {
                write!(f, "Register needed type after scanning: {}", type_name)
            }
            Error::MissingClass { class_name } => write!(f, "Missing class: {}", class_name),
            Error::BadSignature { signature } => {
                write!(f, "Invalid signature passed {}", signature)
            }
            Error::MissingImplementation {
                interface_method,
                class_name,
            } => write!(
                f,
                "No implementation of used interface method {} for type {}",
                interface_method, class_name
            ),
            Error::UnsupportedArrayElement { element_type } => {
                write!(f, "Not supported array type: {}", element_type)
            }
            Error::CycleInHierarchy { remaining } => write!(
                f,
                "No emission order possible, type hierarchy has a cycle through: {}",
                remaining.join(", ")
            ),
            Error::Io(err) => write!(f, "I/O error while writing the module: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}
