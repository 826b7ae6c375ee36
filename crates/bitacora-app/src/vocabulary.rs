//! Controlled vocabulary for hardware components and maintenance actions.
//!
//! The canonical sets are closed and hand-curated; extending them is a data
//! edit here, not a design change. Everything in this module is static data
//! consulted by `pipeline::normalize` and embedded into the generation prompt.

use std::sync::OnceLock;

use strum::{EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

/// Canonical hardware component of a vehicle tracking installation.
///
/// Labels stay in the domain's original Spanish because the synonym table,
/// the prompt, and the historical log data are Spanish-language.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumString, IntoStaticStr,
)]
pub enum Component {
    #[strum(serialize = "GPS")]
    Gps,
    #[strum(serialize = "Paro de Motor")]
    ParoDeMotor,
    #[strum(serialize = "Boton Panico")]
    BotonPanico,
    #[strum(serialize = "Antena GPS")]
    AntenaGps,
    #[strum(serialize = "Antena GPRS")]
    AntenaGprs,
    #[strum(serialize = "Arnés")]
    Arnes,
    #[strum(serialize = "Sensor Puerta")]
    SensorPuerta,
    #[strum(serialize = "Sensor Combustible")]
    SensorCombustible,
    #[strum(serialize = "Sensor Temperatura")]
    SensorTemperatura,
    #[strum(serialize = "Sensor Desenganche")]
    SensorDesenganche,
    #[strum(serialize = "Sensor Impacto")]
    SensorImpacto,
    #[strum(serialize = "Sensor Jamming")]
    SensorJamming,
    #[strum(serialize = "Power Hub")]
    PowerHub,
    #[strum(serialize = "iButton")]
    IButton,
    #[strum(serialize = "Chapa Electronica")]
    ChapaElectronica,
    #[strum(serialize = "Bocina")]
    Bocina,
    #[strum(serialize = "Microfono")]
    Microfono,
    #[strum(serialize = "Telemetria")]
    Telemetria,
    #[strum(serialize = "CAN Bus")]
    CanBus,
    #[strum(serialize = "Camara")]
    Camara,
    #[strum(serialize = "Modulo Voz")]
    ModuloVoz,
    #[strum(serialize = "Display")]
    Display,
    #[strum(serialize = "Sensor DMS")]
    SensorDms,
    #[strum(serialize = "Sensor Fatiga")]
    SensorFatiga,
    #[strum(serialize = "GPS Señuelo")]
    GpsSenuelo,
    #[strum(serialize = "Kit ADAS/DMS")]
    KitAdasDms,
    #[strum(serialize = "GPS Portatil")]
    GpsPortatil,
    #[strum(serialize = "Bateria Respaldo")]
    BateriaRespaldo,
    #[strum(serialize = "Sirena")]
    Sirena,
    #[strum(serialize = "MDVR")]
    Mdvr,
    #[strum(serialize = "Relevador")]
    Relevador,
    #[strum(serialize = "Teclado")]
    Teclado,
    /// Sentinel for text that maps to no canonical component. Events carrying
    /// it are dropped, never stored.
    #[strum(serialize = "Desconocido")]
    Unknown,
}

impl Component {
    /// Canonical display label.
    pub fn label(&self) -> &'static str {
        <&'static str>::from(*self)
    }

    /// All canonical components, excluding the `Unknown` sentinel.
    pub fn canonical() -> impl Iterator<Item = Component> {
        Component::iter().filter(|component| *component != Component::Unknown)
    }

    /// Exact label match against the canonical set (the sentinel excluded).
    pub fn from_label(label: &str) -> Option<Component> {
        Component::canonical().find(|component| component.label() == label)
    }
}

/// Maintenance action performed on a component during one visit.
///
/// `Inspection` and `TankMeasurement` are neutral: they never change the
/// installed state during reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, EnumString, IntoStaticStr)]
pub enum Action {
    #[strum(serialize = "Instalacion")]
    Installation,
    #[strum(serialize = "Desinstalacion")]
    Uninstallation,
    #[strum(serialize = "Reemplazo")]
    Replacement,
    #[strum(serialize = "Revision/Neutra")]
    Inspection,
    #[strum(serialize = "Medicion Tanque")]
    TankMeasurement,
}

impl Action {
    /// Label used on the wire and in exported tables.
    pub fn label(&self) -> &'static str {
        <&'static str>::from(*self)
    }

    /// Whether replaying this action mutates the installed set.
    pub fn mutates_state(&self) -> bool {
        matches!(
            self,
            Action::Installation | Action::Uninstallation | Action::Replacement
        )
    }
}

/// Keyword scan order: more specific actions win over the catch-all
/// `Inspection` bucket, and `TankMeasurement` is checked before it because
/// several of its phrases contain inspection-ish words.
pub const ACTION_PRIORITY: [Action; 5] = [
    Action::Installation,
    Action::Uninstallation,
    Action::Replacement,
    Action::TankMeasurement,
    Action::Inspection,
];

/// Free-text synonym table: lower-cased phrase fragments observed in the
/// service log, mapped to their canonical component. Matching is whole-word.
pub const SYNONYMS: &[(&str, Component)] = &[
    // GPS and device-model variants
    ("gps", Component::Gps),
    ("dispositivo", Component::Gps),
    ("equipo", Component::Gps),
    ("localizador", Component::Gps),
    ("unidad gps", Component::Gps),
    ("equ", Component::Gps),
    ("unidad", Component::Gps),
    ("equipo gps", Component::Gps),
    ("gtrack pro", Component::Gps),
    ("gtrack-pro", Component::Gps),
    ("gtrack", Component::Gps),
    ("trace5", Component::Gps),
    ("teltonika fmb920", Component::Gps),
    ("teltonika fm3612", Component::Gps),
    ("teltonika fmc920", Component::Gps),
    ("teltonika fmc130", Component::Gps),
    ("teltonika fmu125", Component::Gps),
    ("teltonika fmu130", Component::Gps),
    ("teltonika fmm130", Component::Gps),
    ("teltonika fmb120", Component::Gps),
    ("suntech st3300", Component::Gps),
    ("suntech st4300", Component::Gps),
    ("suntech st300", Component::Gps),
    ("ruptela trace5", Component::Gps),
    ("ruptela fm eco4 light", Component::Gps),
    ("ruptela pro5 lite", Component::Gps),
    ("ruptela hcv5", Component::Gps),
    ("concox gt06n", Component::Gps),
    ("concox gt06", Component::Gps),
    ("queclink gv310lau", Component::Gps),
    ("topflytech tlw1-4a/e", Component::Gps),
    ("dk12", Component::Gps),
    // Portable trackers
    ("gps portatil", Component::GpsPortatil),
    ("portatil", Component::GpsPortatil),
    ("equipo portatil", Component::GpsPortatil),
    ("gtrackflex", Component::GpsPortatil),
    ("gtrack flex", Component::GpsPortatil),
    ("sinotrack st-901", Component::GpsPortatil),
    // Decoy units
    ("señuelo", Component::GpsSenuelo),
    ("gps señuelo", Component::GpsSenuelo),
    // Engine cut-off
    ("paro motor", Component::ParoDeMotor),
    ("cortacorriente", Component::ParoDeMotor),
    ("corta corriente", Component::ParoDeMotor),
    ("corte de motor", Component::ParoDeMotor),
    ("bloqueo de motor", Component::ParoDeMotor),
    ("paro", Component::ParoDeMotor),
    ("paro de aceleracion", Component::ParoDeMotor),
    ("bloqueo de acelerador", Component::ParoDeMotor),
    ("corte", Component::ParoDeMotor),
    ("inst corte", Component::ParoDeMotor),
    // Panic button
    ("boton de panico", Component::BotonPanico),
    ("pánico", Component::BotonPanico),
    ("panico", Component::BotonPanico),
    ("botón pánico", Component::BotonPanico),
    ("boton", Component::BotonPanico),
    ("boton asistencia", Component::BotonPanico),
    ("botón de asistencia", Component::BotonPanico),
    // Antennas
    ("antena gps", Component::AntenaGps),
    ("antena gprs", Component::AntenaGprs),
    ("antena celular", Component::AntenaGprs),
    // Harness
    ("arnes", Component::Arnes),
    ("cableado", Component::Arnes),
    ("arnés", Component::Arnes),
    // Door sensors
    ("sensor de puerta", Component::SensorPuerta),
    ("sensor puerta", Component::SensorPuerta),
    ("magnetico puerta", Component::SensorPuerta),
    ("sensor magnético", Component::SensorPuerta),
    ("sensor de apertura", Component::SensorPuerta),
    ("sensor de apertura de puerta", Component::SensorPuerta),
    ("sensor de puerta cableado", Component::SensorPuerta),
    ("sensor de puerta magnetico", Component::SensorPuerta),
    ("sensores de apertura", Component::SensorPuerta),
    // Fuel sensors
    ("sensor de combustible", Component::SensorCombustible),
    ("sensor combustible", Component::SensorCombustible),
    ("medidor combustible", Component::SensorCombustible),
    ("sensor diesel", Component::SensorCombustible),
    ("barras de combustible", Component::SensorCombustible),
    ("barra de combustible", Component::SensorCombustible),
    ("barra", Component::SensorCombustible),
    ("barras", Component::SensorCombustible),
    ("td ble", Component::SensorCombustible),
    // Temperature sensors
    ("sensor de temperatura", Component::SensorTemperatura),
    ("sensor temperatura", Component::SensorTemperatura),
    ("termometro", Component::SensorTemperatura),
    ("sensor t°", Component::SensorTemperatura),
    ("sensor de temperatura bluetooth", Component::SensorTemperatura),
    ("sensor de temperatura cableado", Component::SensorTemperatura),
    ("sensor tipo temp", Component::SensorTemperatura),
    ("sensor bluetooth", Component::SensorTemperatura),
    ("eye sensor", Component::SensorTemperatura),
    ("temp sensor", Component::SensorTemperatura),
    ("ble sensor", Component::SensorTemperatura),
    ("sensor t", Component::SensorTemperatura),
    ("dallas", Component::SensorTemperatura),
    // Other sensors
    ("sensor de desenganche", Component::SensorDesenganche),
    ("sensor desenganche", Component::SensorDesenganche),
    ("sensor quinta rueda", Component::SensorDesenganche),
    ("sensor de impacto", Component::SensorImpacto),
    ("sensor impacto", Component::SensorImpacto),
    ("sensor colision", Component::SensorImpacto),
    ("sensor de colision", Component::SensorImpacto),
    ("sensor jamming", Component::SensorJamming),
    ("detector jamming", Component::SensorJamming),
    ("anti jamming", Component::SensorJamming),
    ("detector de jamming", Component::SensorJamming),
    ("sensor dms", Component::SensorDms),
    ("sensor fatiga", Component::SensorFatiga),
    ("sensor de fatiga", Component::SensorFatiga),
    // Power hub
    ("power hub", Component::PowerHub),
    ("hub de energia", Component::PowerHub),
    ("hub energia", Component::PowerHub),
    ("powerhub", Component::PowerHub),
    ("power lite", Component::PowerHub),
    ("pw hub", Component::PowerHub),
    ("phub", Component::PowerHub),
    ("pwl", Component::PowerHub),
    // Backup battery
    ("bateria respaldo", Component::BateriaRespaldo),
    ("bateria de respaldo", Component::BateriaRespaldo),
    ("backup battery", Component::BateriaRespaldo),
    ("batería respaldo", Component::BateriaRespaldo),
    ("bateria", Component::BateriaRespaldo),
    ("pila interna", Component::BateriaRespaldo),
    // iButton
    ("ibutton", Component::IButton),
    ("identificador operador", Component::IButton),
    ("llave dallas", Component::IButton),
    ("lector ibutton", Component::IButton),
    ("cableado de ibutton", Component::IButton),
    ("llave", Component::IButton),
    // Electronic lock
    ("chapa electronica", Component::ChapaElectronica),
    ("candado electronico", Component::ChapaElectronica),
    ("electrochapa", Component::ChapaElectronica),
    ("chapa eléctrica", Component::ChapaElectronica),
    // Siren
    ("sirena", Component::Sirena),
    // Microphone
    ("microfono", Component::Microfono),
    ("escucha cabina", Component::Microfono),
    ("micrófono", Component::Microfono),
    ("micro", Component::Microfono),
    // Speaker
    ("bocina", Component::Bocina),
    ("altavoz", Component::Bocina),
    // Telemetry
    ("telemetria", Component::Telemetria),
    // CAN bus readers
    ("can bus", Component::CanBus),
    ("computadora vehiculo", Component::CanBus),
    ("lector canbus", Component::CanBus),
    ("can", Component::CanBus),
    ("easy can", Component::CanBus),
    ("easycan", Component::CanBus),
    ("canst20", Component::CanBus),
    ("can-st20", Component::CanBus),
    // Cameras
    ("camara", Component::Camara),
    ("cámara", Component::Camara),
    ("camaras", Component::Camara),
    ("camaras exteriores", Component::Camara),
    ("camara frontal", Component::Camara),
    ("camara tipo domo", Component::Camara),
    ("sistema de camaras", Component::Camara),
    ("camara exterior", Component::Camara),
    // MDVR
    ("mdvr", Component::Mdvr),
    ("dvr", Component::Mdvr),
    // Voice module
    ("modulo de voz", Component::ModuloVoz),
    ("voz", Component::ModuloVoz),
    ("módulo voz", Component::ModuloVoz),
    // Display
    ("display", Component::Display),
    ("pantalla", Component::Display),
    // ADAS/DMS kits
    ("adas", Component::KitAdasDms),
    ("dms", Component::KitAdasDms),
    ("kit adas", Component::KitAdasDms),
    ("sistema adas", Component::KitAdasDms),
    ("sistema adas y dms", Component::KitAdasDms),
    ("kit adas + dms", Component::KitAdasDms),
    // Remaining accessories seen in the log
    ("relevador", Component::Relevador),
    ("teclado", Component::Teclado),
];

/// Synonym entries ordered longest-key-first so more specific phrases
/// ("gps portatil") win over shorter general ones ("gps"). Computed once.
pub fn synonyms_longest_first() -> &'static [(&'static str, Component)] {
    static ORDERED: OnceLock<Vec<(&'static str, Component)>> = OnceLock::new();
    ORDERED.get_or_init(|| {
        let mut entries = SYNONYMS.to_vec();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(b.0)));
        entries
    })
}

/// Keyword fragments that resolve a free-text action phrase to its category.
pub fn keywords_for(action: Action) -> &'static [&'static str] {
    match action {
        Action::Installation => &[
            "instalacion",
            "instala",
            "instalar",
            "inst",
            "agrega",
            "colocacion",
            "activacion",
            "conectar",
            "nuevo",
            "puesta en marcha",
            "se instalo",
            "se puso",
            "instalación nueva",
            "se le instala",
            "se asigna",
            "se le aplica",
            "con instalacion de",
            "se coloca",
        ],
        Action::Uninstallation => &[
            "desinstalacion",
            "desinstala",
            "desinstalar",
            "retiro",
            "quita",
            "baja",
            "eliminar",
            "desconectar",
            "se retiro",
            "se quito",
            "retiro de",
            "desisntalacion",
            "equipo perdido",
            "se da de baja",
            "se retira",
            "no regresa",
            "baja en plataforma",
            "desistalacion",
            "desinstalación",
        ],
        Action::Replacement => &[
            "cambio",
            "cambiar",
            "reemplazo",
            "reemplazar",
            "sustitucion",
            "sustituir",
            "se hace cambio de",
            "se cambia",
            "cambiio",
        ],
        Action::TankMeasurement => &[
            "medicion de tanque",
            "medir tanque",
            "calibracion tanque",
            "aforar",
            "aforo",
            "verificacion de nivel",
            "medicion inicial",
            "registro de nivel",
            "chequeo de nivel",
            "se midio el tanque",
            "medicion diesel",
            "medicion gasolina",
            "se tomaron niveles",
            "medición de nivel",
        ],
        Action::Inspection => &[
            "revision",
            "revisar",
            "mantenimiento",
            "diagnostico",
            "chequeo",
            "verificacion",
            "configuracion",
            "falla",
            "problema",
            "ajuste",
            "soporte",
            "prueba",
            "limpieza",
            "actualizacion",
            "no funciona",
            "reporta",
            "visita tecnica",
            "reset",
            "se hizo un reset",
            "se checa",
            "se verifica",
            "se conecta",
            "se reconecta",
            "energizada",
            "reubicó",
            "desconecta arnes",
            "se aplica reset",
            "se cambia conexion",
            "se cambia tierra",
            "se cambia corriente",
            "reacomodan",
            "calibracion",
            "cotejo",
            "se fija",
            "se ajusta",
            "revisan conexiones",
            "se energiza",
            "se restablece",
            "se monitorea",
            "se reubica",
            "se corrige",
            "se repara",
            "se activa",
            "se asigna este equipo",
            "se recupera equipo",
        ],
    }
}
