//! AI analysis of a patient's prescription history

use medrx_core::PatientDetail;

use super::client::GeminiClient;

/// Analyze a patient's stored history against a practitioner's query.
///
/// The model's reply is returned as opaque prose; nothing is parsed
/// out of it and there is no local fallback.
pub async fn analyze_history(
    client: &GeminiClient,
    patient: &PatientDetail,
    query: &str,
) -> Result<String, String> {
    let prompt = build_analysis_prompt(patient, query);
    client.generate_text(&prompt).await
}

/// Build the analysis prompt: the practitioner's query, the patient's
/// projected record, and a fixed glossary of remedy abbreviations and
/// medicine-condition mappings.
fn build_analysis_prompt(patient: &PatientDetail, query: &str) -> String {
    format!(
        r#"HOMEOPATHIC MEDICAL ANALYSIS

Medical Query: "{query}"

PATIENT INFORMATION:
- Patient ID: {pid}
- Name: {first_name} {last_name}
- Age: {age}, Gender: {gender}
- Address: {address}
- First Visit: {first_visit}
- Full Prescriptions: {prescriptions}

PRESCRIPTION UNDERSTANDING:
- "|--|" separates different prescription visits/dates
- Common homeopathic abbreviations:
  * arn=Arnica Montana, bry=Bryonia Alba, aco=Aconitum Napellus
  * ruta=Ruta Graveolens, phyto=Phytolacca, sulfo/sul=Sulphur
  * fp=Ferrum Phosphoricum, nm=Natrum Muriaticum, chame=Chamomilla
  * thy=Thyroidinum, lssl=Lycopodium, cp=Carcinosin, mp=Magnesia Phosphorica
  * np=Natrum Phosphoricum, kp=Kali Phosphoricum, sl=Sac Lac
  * nux=Nux Vomica, apis=Apis Mellifica, cf=Calcarea Fluorica
- Potencies: 30, 200c, 6x, 1M indicate medicine strength/dilution levels
- bid=twice daily, tid=three times daily, hd=high dilution

MEDICINE-CONDITION MAPPING:
- arn (Arnica) -> trauma, bruises, muscle soreness, post-surgical healing
- bry (Bryonia) -> dry cough, headaches, joint pain, respiratory issues
- thy (Thyroidinum) -> thyroid disorders, metabolism issues
- lssl (Lycopodium) -> digestive issues, liver problems, bloating
- cp (Carcinosin) -> constitutional remedy for chronic conditions
- mp (Magnesia Phos) -> muscle cramps, neuralgic pain, spasms
- nux (Nux Vomica) -> digestive disorders, constipation, stress
- sul (Sulphur) -> skin conditions, chronic diseases, constitutional remedy

PROVIDE COMPREHENSIVE ANALYSIS:
1. What homeopathic medicines were prescribed to this patient?
2. What medical conditions do these medicines suggest?
3. What is the treatment timeline and progression?
4. Based on the query, what specific insights can you provide?
5. What recommendations would you make for similar cases?
6. Are there any patterns in the prescription history?

Keep the analysis practical and focused on medical insights that would help a homeopathic practitioner understand this patient's case."#,
        query = query,
        pid = patient.pid,
        first_name = patient.first_name,
        last_name = patient.last_name,
        age = patient.age,
        gender = patient.gender,
        address = patient.address,
        first_visit = patient.first_visit,
        prescriptions = patient.prescriptions,
    )
}
